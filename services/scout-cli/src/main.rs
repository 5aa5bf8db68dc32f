//! scout, a RobotEvents API command-line client
//!
//! One-shot CLI over the request engine:
//! 1. Loads configuration (file, then env overrides)
//! 2. Builds the credential pools and the persisted team cache
//! 3. Runs a single command and prints its JSON result on stdout

mod adapters;
mod config;
mod error;

use std::sync::Arc;

use anyhow::{Context, Result};
use robotevents_cache::{FileStorage, TeamCache};
use robotevents_client::{Query, RobotEventsClient};
use robotevents_pool::KeyPoolManager;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::adapters::ScoutApi;
use crate::config::Config;

const USAGE: &str = "\
scout - RobotEvents API client

Usage: scout [--config <path>] <command>

Commands:
  team <number> [--program <id>]   Resolve a team by number (program defaults to 1, VRC)
  rankings <event-id> <division>   Fetch the full ranking table for a division
  raw <path> [key=value ...]       Execute a raw GET against the API
  status                           Show credential pool health

Environment:
  SCOUT_CONFIG             Config file path (default: scout.toml)
  SCOUT_API_KEYS           Comma-separated general keys, overrides the config file
  SCOUT_TEAM_BROWSER_KEYS  Comma-separated team-browser keys
  LOG_LEVEL                Tracing filter (default: info)
";

/// Upstream program id used when `team` is given no `--program`. 1 is VRC.
const DEFAULT_PROGRAM: u32 = 1;

#[derive(Debug, PartialEq)]
enum Command {
    Team {
        number: String,
        program: u32,
    },
    Rankings {
        event_id: i64,
        division: i64,
    },
    Raw {
        path: String,
        params: Vec<(String, String)>,
    },
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout carries nothing but command output.
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (cli_config, command) = match parse_args(args) {
        Ok(parsed) => parsed,
        Err(message) => {
            eprintln!("{message}\n\n{USAGE}");
            std::process::exit(2);
        }
    };

    let config_path = Config::resolve_path(cli_config.as_deref());
    // An explicitly named file must exist; only the default path may be
    // silently absent.
    let explicitly_named = cli_config.is_some() || std::env::var("SCOUT_CONFIG").is_ok();
    let config = if explicitly_named {
        Config::load(&config_path)
    } else {
        Config::load_if_present(&config_path)
    }
    .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    if config.keys.general.is_empty() {
        warn!("no general API keys configured, requests go out unauthenticated");
    }

    let pools = Arc::new(KeyPoolManager::new(
        config.general_keys(),
        config.team_browser_keys(),
        config.pool_config(),
    ));
    pools.reset_all();

    let storage = Arc::new(FileStorage::new(config.cache.dir.clone()));
    let cache = TeamCache::new(storage, config.cache_ttl());
    cache.initialize().await;
    info!(entries = cache.len(), "team cache loaded");

    let client = RobotEventsClient::new(pools.clone(), config.client_config());
    let api = ScoutApi::new(client, cache.clone());

    let exit_code = run_command(&api, &pools, command).await?;

    if let Some(degraded) = pools.degraded_info() {
        if degraded.should_show_notification {
            warn!("{}", degraded.message);
            pools.mark_notification_shown();
        }
    }
    cache.flush().await;

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

async fn run_command(api: &ScoutApi, pools: &KeyPoolManager, command: Command) -> Result<i32> {
    match command {
        Command::Team { number, program } => match api.resolve_team(&number, program).await {
            Some(team) => {
                print_json(&team)?;
                Ok(0)
            }
            None => {
                eprintln!("team {number} not found");
                Ok(1)
            }
        },
        Command::Rankings { event_id, division } => {
            let rows = api.event_rankings(event_id, division).await;
            info!(rows = rows.len(), "rankings fetched");
            print_json(&serde_json::Value::Array(rows))?;
            Ok(0)
        }
        Command::Raw { path, params } => {
            let mut query = Query::new();
            for (key, value) in &params {
                query = query.set(key, value);
            }
            match api.raw(&path, &query).await {
                Some(payload) => {
                    print_json(&payload)?;
                    Ok(0)
                }
                None => {
                    eprintln!("request failed, see log output");
                    Ok(1)
                }
            }
        }
        Command::Status => {
            print_json(&pools.stats())?;
            Ok(0)
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("rendering output")?;
    println!("{rendered}");
    Ok(())
}

/// Parse CLI arguments into the config path override and the command.
fn parse_args(mut args: Vec<String>) -> std::result::Result<(Option<String>, Command), String> {
    let cli_config = take_flag(&mut args, "--config")?;
    if args.is_empty() {
        return Err("no command given".to_string());
    }
    let command = args.remove(0);
    let command = match command.as_str() {
        "team" => {
            let program = match take_flag(&mut args, "--program")? {
                Some(raw) => raw
                    .parse::<u32>()
                    .map_err(|_| format!("--program must be a numeric id, got: {raw}"))?,
                None => DEFAULT_PROGRAM,
            };
            if args.len() != 1 {
                return Err("team takes exactly one team number".to_string());
            }
            Command::Team {
                number: args.remove(0),
                program,
            }
        }
        "rankings" => {
            if args.len() != 2 {
                return Err("rankings takes an event id and a division id".to_string());
            }
            let event_id = parse_id(&args[0], "event id")?;
            let division = parse_id(&args[1], "division id")?;
            Command::Rankings { event_id, division }
        }
        "raw" => {
            if args.is_empty() {
                return Err("raw takes an API path".to_string());
            }
            let path = args.remove(0);
            let mut params = Vec::new();
            for pair in args {
                match pair.split_once('=') {
                    Some((key, value)) => params.push((key.to_string(), value.to_string())),
                    None => return Err(format!("raw parameters must be key=value, got: {pair}")),
                }
            }
            Command::Raw { path, params }
        }
        "status" => {
            if !args.is_empty() {
                return Err("status takes no arguments".to_string());
            }
            Command::Status
        }
        other => return Err(format!("unknown command: {other}")),
    };
    Ok((cli_config, command))
}

/// Remove `flag` and its value from `args`, wherever they appear.
fn take_flag(args: &mut Vec<String>, flag: &str) -> std::result::Result<Option<String>, String> {
    match args.iter().position(|a| a == flag) {
        Some(i) => {
            if i + 1 >= args.len() {
                return Err(format!("{flag} requires a value"));
            }
            args.remove(i);
            Ok(Some(args.remove(i)))
        }
        None => Ok(None),
    }
}

fn parse_id(raw: &str, what: &str) -> std::result::Result<i64, String> {
    raw.parse::<i64>()
        .map_err(|_| format!("{what} must be numeric, got: {raw}"))
}
