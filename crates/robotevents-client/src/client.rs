//! Request execution against the RobotEvents API
//!
//! One logical GET: reserve a dispatch slot, lease a credential, classify
//! the response, rotate keys on auth rejection, wait out rate limits, and
//! surface typed failures for everything else. Auth retries are bounded by
//! the pool size so the loop always terminates; 429 retries are
//! deliberately unbounded and reuse the same lease.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, RETRY_AFTER};
use robotevents_pool::{
    classify_response, is_html_document, KeyLease, KeyPoolManager, ResponseClass, TrafficClass,
};
use serde_json::Value;
use tracing::{info, instrument, warn};
use url::Url;

use crate::constants::{
    API_BASE_URL, DEFAULT_MIN_INTERVAL_MS, DEFAULT_RETRY_AFTER_SECS, MAX_PAGES, MAX_PAGE_SIZE,
};
use crate::error::{Error, Result};
use crate::limiter::RateLimiter;
use crate::metrics;
use crate::query::{build_url, Query};

/// Tunable executor behavior. `Default` matches production values.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Minimum spacing between dispatch starts, shared across classes.
    pub min_interval: Duration,
    /// Wait applied to a 429 that carries no `Retry-After` header.
    pub default_retry_after: Duration,
    /// `per_page` injected for listings and used by the pagination driver.
    pub max_page_size: u32,
    /// Hard upper bound on pages fetched for one listing.
    pub page_cap: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: API_BASE_URL.to_string(),
            min_interval: Duration::from_millis(DEFAULT_MIN_INTERVAL_MS),
            default_retry_after: Duration::from_secs(DEFAULT_RETRY_AFTER_SECS),
            max_page_size: MAX_PAGE_SIZE,
            page_cap: MAX_PAGES,
        }
    }
}

/// What one send/classify round means for the retry loop.
enum Outcome {
    Success(Value),
    AuthRejected,
}

/// Issues authenticated GET requests with credential rotation.
pub struct RobotEventsClient {
    pub(crate) http: reqwest::Client,
    pub(crate) pools: Arc<KeyPoolManager>,
    pub(crate) limiter: RateLimiter,
    pub(crate) config: ClientConfig,
}

impl RobotEventsClient {
    pub fn new(pools: Arc<KeyPoolManager>, config: ClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            limiter: RateLimiter::new(config.min_interval),
            pools,
            config,
        }
    }

    pub fn pools(&self) -> &KeyPoolManager {
        &self.pools
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Execute one logical GET and return the parsed JSON payload.
    pub async fn execute(&self, path: &str, query: &Query, class: TrafficClass) -> Result<Value> {
        let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
        self.execute_inner(path, query, class, request_id).await
    }

    #[instrument(skip_all, fields(request_id = %request_id, path = %path, class = class.label()))]
    async fn execute_inner(
        &self,
        path: &str,
        query: &Query,
        class: TrafficClass,
        request_id: String,
    ) -> Result<Value> {
        let url = build_url(&self.config.base_url, path, query, self.config.max_page_size)?;
        let started = Instant::now();
        // Retry budget is one fewer than the credentials available, so a
        // pool of one gets no second chance after its first rejection.
        let budget = self.pools.pool_len(class).saturating_sub(1);
        let mut retries = 0usize;
        loop {
            let lease = self.pools.select(class, true);
            match self.attempt(&url, lease.as_ref(), class).await {
                Ok(Outcome::Success(payload)) => {
                    if let Some(lease) = &lease {
                        self.pools.mark_success(lease);
                    }
                    metrics::record_request(
                        class.label(),
                        "success",
                        started.elapsed().as_secs_f64(),
                    );
                    return Ok(payload);
                }
                Ok(Outcome::AuthRejected) => {
                    if let Some(lease) = &lease {
                        self.pools.mark_failed(lease);
                        metrics::record_key_rotation(lease.pool.label());
                    }
                    if retries >= budget {
                        metrics::record_request(
                            class.label(),
                            "auth_exhausted",
                            started.elapsed().as_secs_f64(),
                        );
                        return Err(Error::AuthExhausted {
                            attempts: retries + 1,
                        });
                    }
                    retries += 1;
                    warn!(retries, budget, "credential rejected, retrying with the next key");
                }
                Err(err) => {
                    metrics::record_request(
                        class.label(),
                        outcome_label(&err),
                        started.elapsed().as_secs_f64(),
                    );
                    return Err(err);
                }
            }
        }
    }

    /// One send/classify round on a fixed lease.
    ///
    /// 429 responses never escape: the wait from `Retry-After` (or the
    /// configured default) is slept out and the identical request reissued
    /// on the same lease, without consuming a retry slot.
    async fn attempt(
        &self,
        url: &Url,
        lease: Option<&KeyLease>,
        class: TrafficClass,
    ) -> Result<Outcome> {
        loop {
            self.limiter.acquire().await;
            let mut request = self.http.get(url.clone());
            if let Some(lease) = lease {
                request = request.bearer_auth(lease.key.expose());
            }
            let response = request
                .send()
                .await
                .map_err(|e| Error::Network(format!("GET {url} failed: {e}")))?;
            let status = response.status().as_u16();
            let retry_after = parse_retry_after(response.headers());
            let body = response
                .text()
                .await
                .map_err(|e| Error::Network(format!("reading body from {url}: {e}")))?;

            match classify_response(status, &body) {
                ResponseClass::RateLimited => {
                    let wait = retry_after.unwrap_or(self.config.default_retry_after);
                    metrics::record_rate_limited(class.label());
                    info!(
                        wait_ms = wait.as_millis() as u64,
                        "rate limited, waiting out Retry-After"
                    );
                    tokio::time::sleep(wait).await;
                }
                ResponseClass::AuthRejected => return Ok(Outcome::AuthRejected),
                ResponseClass::Success => {
                    return match serde_json::from_str::<Value>(&body) {
                        Ok(payload) => Ok(Outcome::Success(payload)),
                        // An HTML document where JSON belongs is the login
                        // redirect, even without the login word.
                        Err(_) if is_html_document(&body) => Ok(Outcome::AuthRejected),
                        Err(e) => Err(Error::Parse(format!("decoding response from {url}: {e}"))),
                    };
                }
                ResponseClass::Failed => return Err(Error::Http { status, body }),
            }
        }
    }
}

fn outcome_label(err: &Error) -> &'static str {
    match err {
        Error::AuthExhausted { .. } => "auth_exhausted",
        Error::Http { .. } => "http_error",
        Error::Parse(_) => "parse_error",
        Error::Url(_) => "url_error",
        Error::Network(_) => "network_error",
    }
}

/// Parse a `Retry-After` header given in whole seconds. HTTP-date values
/// and anything else unparseable fall through to the configured default.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
