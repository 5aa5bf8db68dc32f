//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! API keys may come from the TOML `[keys]` tables or from the
//! SCOUT_API_KEYS / SCOUT_TEAM_BROWSER_KEYS env vars (comma-separated),
//! with the env vars winning so deployments can keep keys out of files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use robotevents_client::constants::{
    API_BASE_URL, DEFAULT_MIN_INTERVAL_MS, DEFAULT_RETRY_AFTER_SECS, MAX_PAGES, MAX_PAGE_SIZE,
};
use robotevents_client::ClientConfig;
use robotevents_pool::{ApiKey, KeyPoolConfig};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Root configuration
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub keys: KeysConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Credential lists per traffic class. Order matters: it is the rotation
/// order for the process lifetime.
#[derive(Debug, Default, Deserialize)]
pub struct KeysConfig {
    #[serde(default)]
    pub general: Vec<String>,
    #[serde(default)]
    pub team_browser: Vec<String>,
}

/// Upstream API and executor settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    #[serde(default = "default_retry_after_secs")]
    pub retry_after_secs: u64,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
    #[serde(default = "default_page_cap")]
    pub page_cap: u32,
}

/// Credential pool rotation settings
#[derive(Debug, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "default_calls_before_rotation")]
    pub calls_before_rotation: u32,
    #[serde(default = "default_max_failed_cycles")]
    pub max_failed_cycles: u32,
    #[serde(default = "default_failed_reset_window_secs")]
    pub failed_reset_window_secs: u64,
}

/// Team-resolution cache settings
#[derive(Debug, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_base_url() -> String {
    API_BASE_URL.to_string()
}

fn default_min_interval_ms() -> u64 {
    DEFAULT_MIN_INTERVAL_MS
}

fn default_retry_after_secs() -> u64 {
    DEFAULT_RETRY_AFTER_SECS
}

fn default_max_page_size() -> u32 {
    MAX_PAGE_SIZE
}

fn default_page_cap() -> u32 {
    MAX_PAGES
}

fn default_calls_before_rotation() -> u32 {
    20
}

fn default_max_failed_cycles() -> u32 {
    2
}

fn default_failed_reset_window_secs() -> u64 {
    3600
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".scout-cache")
}

fn default_cache_ttl_secs() -> u64 {
    7 * 24 * 60 * 60
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            min_interval_ms: default_min_interval_ms(),
            retry_after_secs: default_retry_after_secs(),
            max_page_size: default_max_page_size(),
            page_cap: default_page_cap(),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            calls_before_rotation: default_calls_before_rotation(),
            max_failed_cycles: default_max_failed_cycles(),
            failed_reset_window_secs: default_failed_reset_window_secs(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment
    /// variables and validate.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("reading {}: {e}", path.display())))?;
        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("parsing {}: {e}", path.display())))?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load the file at `path` if it exists; otherwise start from defaults.
    /// Env overlay and validation apply either way.
    pub fn load_if_present(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }
        let mut config = Config::default();
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Resolve config file path from CLI arg or SCOUT_CONFIG env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("SCOUT_CONFIG") {
            return PathBuf::from(p);
        }
        PathBuf::from("scout.toml")
    }

    fn apply_env(&mut self) {
        if let Some(keys) = keys_from_env("SCOUT_API_KEYS") {
            self.keys.general = keys;
        }
        if let Some(keys) = keys_from_env("SCOUT_TEAM_BROWSER_KEYS") {
            self.keys.team_browser = keys;
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.api.base_url.starts_with("http://")
            && !self.api.base_url.starts_with("https://")
        {
            return Err(Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }
        if self.api.min_interval_ms == 0 {
            return Err(Error::Config(
                "min_interval_ms must be greater than 0".into(),
            ));
        }
        if self.api.max_page_size == 0 || self.api.max_page_size > MAX_PAGE_SIZE {
            return Err(Error::Config(format!(
                "max_page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        if self.api.page_cap == 0 {
            return Err(Error::Config("page_cap must be greater than 0".into()));
        }
        if self.pool.calls_before_rotation == 0 {
            return Err(Error::Config(
                "calls_before_rotation must be greater than 0".into(),
            ));
        }
        if self.pool.max_failed_cycles == 0 {
            return Err(Error::Config(
                "max_failed_cycles must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.api.base_url.clone(),
            min_interval: Duration::from_millis(self.api.min_interval_ms),
            default_retry_after: Duration::from_secs(self.api.retry_after_secs),
            max_page_size: self.api.max_page_size,
            page_cap: self.api.page_cap,
        }
    }

    pub fn pool_config(&self) -> KeyPoolConfig {
        KeyPoolConfig {
            calls_before_rotation: self.pool.calls_before_rotation,
            max_failed_cycles: self.pool.max_failed_cycles,
            failed_reset_window: Duration::from_secs(self.pool.failed_reset_window_secs),
        }
    }

    pub fn general_keys(&self) -> Vec<ApiKey> {
        self.keys.general.iter().map(ApiKey::new).collect()
    }

    pub fn team_browser_keys(&self) -> Vec<ApiKey> {
        self.keys.team_browser.iter().map(ApiKey::new).collect()
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }
}

/// Parse a comma-separated key list from an env var. Unset, empty, or
/// all-blank values leave the file configuration untouched.
fn keys_from_env(var: &str) -> Option<Vec<String>> {
    let raw = std::env::var(var).ok()?;
    let keys: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect();
    if keys.is_empty() { None } else { Some(keys) }
}
