//! Typed accessors over the request engine
//!
//! Every terminal error from the engine is converted into a safe default
//! (empty list or `None`) plus a logged warning; callers never see a crash
//! because the upstream had a bad day. Team resolution consults the
//! persisted cache before touching the network.

use robotevents_cache::TeamCache;
use robotevents_client::{Query, RobotEventsClient};
use robotevents_pool::TrafficClass;
use serde_json::Value;
use tracing::{debug, warn};

/// High-level API surface consumed by the CLI commands.
pub struct ScoutApi {
    client: RobotEventsClient,
    cache: TeamCache,
}

impl ScoutApi {
    pub fn new(client: RobotEventsClient, cache: TeamCache) -> Self {
        Self { client, cache }
    }

    /// Resolve a team number to its API record, cache first.
    ///
    /// Resolution traffic rides the team-browser pool so bulk lookups
    /// cannot starve the general pool. A hit refreshes nothing; a miss
    /// that resolves is cached under (number, program).
    pub async fn resolve_team(&self, number: &str, program: u32) -> Option<Value> {
        let program_key = program.to_string();
        if let Some(entry) = self.cache.get(number, &program_key) {
            debug!(team = number, team_id = entry.team_id, "team resolved from cache");
            return Some(entry.payload);
        }

        let query = Query::new()
            .set_all("number", [number])
            .set_all("program", [program]);
        let payload = match self
            .client
            .execute("/teams", &query, TrafficClass::TeamBrowser)
            .await
        {
            Ok(payload) => payload,
            Err(e) => {
                warn!(team = number, error = %e, "team lookup failed");
                return None;
            }
        };

        let team = payload
            .get("data")
            .and_then(Value::as_array)
            .and_then(|teams| teams.first())
            .cloned();
        match team {
            Some(team) => {
                if let Some(team_id) = team.get("id").and_then(Value::as_i64) {
                    self.cache.put(number, &program_key, team_id, team.clone());
                }
                Some(team)
            }
            None => {
                debug!(team = number, "no team matched the lookup");
                None
            }
        }
    }

    /// Fetch the complete ranking table for one division of an event.
    pub async fn event_rankings(&self, event_id: i64, division: i64) -> Vec<Value> {
        let path = format!("/events/{event_id}/divisions/{division}/rankings");
        match self
            .client
            .execute_paged(&path, &Query::new(), TrafficClass::General)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!(event = event_id, division, error = %e, "rankings fetch failed");
                Vec::new()
            }
        }
    }

    /// Execute an arbitrary GET and return the raw JSON payload.
    pub async fn raw(&self, path: &str, query: &Query) -> Option<Value> {
        match self.client.execute(path, query, TrafficClass::General).await {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!(path, error = %e, "request failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::get;
    use robotevents_cache::MemoryStorage;
    use robotevents_client::ClientConfig;
    use robotevents_pool::{ApiKey, KeyPoolConfig, KeyPoolManager};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::net::TcpListener;

    const TEAM_JSON: &str =
        r#"{"data":[{"id":77777,"number":"254C","team_name":"Cheesy Poofs"}],"meta":{"current_page":1,"last_page":1}}"#;

    async fn serve(app: axum::Router) -> (String, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let url = format!("http://{addr}");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (url, handle)
    }

    fn api(base_url: String, ttl: Duration) -> ScoutApi {
        let pools = Arc::new(KeyPoolManager::new(
            vec![ApiKey::new("general-key")],
            vec![ApiKey::new("browser-key")],
            KeyPoolConfig::default(),
        ));
        let client = RobotEventsClient::new(
            pools,
            ClientConfig {
                base_url,
                min_interval: Duration::from_millis(1),
                default_retry_after: Duration::from_millis(50),
                max_page_size: 250,
                page_cap: 200,
            },
        );
        let cache = TeamCache::new(Arc::new(MemoryStorage::new()), ttl);
        ScoutApi::new(client, cache)
    }

    #[tokio::test]
    async fn resolve_team_caches_after_first_lookup() {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = axum::Router::new().route(
            "/teams",
            get({
                let hits = hits.clone();
                move || {
                    let hits = hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        TEAM_JSON
                    }
                }
            }),
        );
        let (url, _server) = serve(app).await;
        let api = api(url, Duration::from_secs(3600));

        let first = api.resolve_team("254C", 1).await.unwrap();
        let second = api.resolve_team("254C", 1).await.unwrap();

        assert_eq!(first["id"], 77777);
        assert_eq!(second["id"], 77777);
        assert_eq!(hits.load(Ordering::SeqCst), 1, "second lookup must be served from cache");
    }

    #[tokio::test]
    async fn resolve_team_filters_ride_the_team_browser_pool() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let app = axum::Router::new().route(
            "/teams",
            get({
                let seen = seen.clone();
                move |headers: axum::http::HeaderMap,
                      axum::extract::RawQuery(query): axum::extract::RawQuery| {
                    let seen = seen.clone();
                    async move {
                        let auth = headers
                            .get(axum::http::header::AUTHORIZATION)
                            .and_then(|v| v.to_str().ok())
                            .map(String::from);
                        seen.lock().unwrap().push((auth, query.unwrap_or_default()));
                        TEAM_JSON
                    }
                }
            }),
        );
        let (url, _server) = serve(app).await;
        let api = api(url, Duration::from_secs(3600));

        api.resolve_team("254C", 1).await.unwrap();

        let seen = seen.lock().unwrap();
        let (auth, query) = &seen[0];
        assert_eq!(auth.as_deref(), Some("Bearer browser-key"));
        assert!(query.contains("number%5B%5D=254C"), "query was: {query}");
        assert!(query.contains("program%5B%5D=1"), "query was: {query}");
    }

    #[tokio::test]
    async fn resolve_team_no_match_is_not_cached() {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = axum::Router::new().route(
            "/teams",
            get({
                let hits = hits.clone();
                move || {
                    let hits = hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        r#"{"data":[],"meta":{"current_page":1,"last_page":1}}"#
                    }
                }
            }),
        );
        let (url, _server) = serve(app).await;
        let api = api(url, Duration::from_secs(3600));

        assert!(api.resolve_team("9999X", 1).await.is_none());
        assert!(api.resolve_team("9999X", 1).await.is_none());
        assert_eq!(hits.load(Ordering::SeqCst), 2, "a miss must not poison the cache");
    }

    #[tokio::test]
    async fn resolve_team_expired_entry_refetches() {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = axum::Router::new().route(
            "/teams",
            get({
                let hits = hits.clone();
                move || {
                    let hits = hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        TEAM_JSON
                    }
                }
            }),
        );
        let (url, _server) = serve(app).await;
        // Zero TTL: every cached entry is already expired on read.
        let api = api(url, Duration::ZERO);

        api.resolve_team("254C", 1).await.unwrap();
        api.resolve_team("254C", 1).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn resolve_team_upstream_failure_returns_none() {
        let app = axum::Router::new().route(
            "/teams",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "nope") }),
        );
        let (url, _server) = serve(app).await;
        let api = api(url, Duration::from_secs(3600));

        assert!(api.resolve_team("254C", 1).await.is_none());
    }

    #[tokio::test]
    async fn event_rankings_returns_rows() {
        let app = axum::Router::new().route(
            "/events/123/divisions/1/rankings",
            get(|| async {
                r#"{"data":[{"rank":1},{"rank":2}],"meta":{"current_page":1,"last_page":1}}"#
            }),
        );
        let (url, _server) = serve(app).await;
        let api = api(url, Duration::from_secs(3600));

        let rows = api.event_rankings(123, 1).await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["rank"], 1);
    }

    #[tokio::test]
    async fn event_rankings_failure_degrades_to_empty() {
        let app = axum::Router::new().route(
            "/events/123/divisions/1/rankings",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let (url, _server) = serve(app).await;
        let api = api(url, Duration::from_secs(3600));

        assert!(api.event_rankings(123, 1).await.is_empty());
    }

    #[tokio::test]
    async fn raw_failure_degrades_to_none() {
        let app = axum::Router::new().route(
            "/seasons",
            get(|| async { (StatusCode::BAD_GATEWAY, "bad gateway") }),
        );
        let (url, _server) = serve(app).await;
        let api = api(url, Duration::from_secs(3600));

        assert!(api.raw("/seasons", &Query::new()).await.is_none());
    }

    #[tokio::test]
    async fn raw_returns_payload() {
        let app = axum::Router::new()
            .route("/seasons/190", get(|| async { r#"{"id":190,"name":"Over Under"}"# }));
        let (url, _server) = serve(app).await;
        let api = api(url, Duration::from_secs(3600));

        let payload = api.raw("/seasons/190", &Query::new()).await.unwrap();
        assert_eq!(payload["name"], "Over Under");
    }
}
