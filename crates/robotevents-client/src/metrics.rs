//! Request execution metrics
//!
//! Counters and one latency histogram recorded through the `metrics`
//! facade; the embedding binary decides whether a recorder is installed:
//!
//! - `robotevents_requests_total` (counter): labels `class`, `outcome`
//! - `robotevents_request_duration_seconds` (histogram): label `class`
//! - `robotevents_rate_limited_total` (counter): label `class`
//! - `robotevents_key_rotations_total` (counter): label `pool`

/// Record one completed logical request with its terminal outcome.
pub fn record_request(class: &str, outcome: &str, duration_secs: f64) {
    metrics::counter!(
        "robotevents_requests_total",
        "class" => class.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "robotevents_request_duration_seconds",
        "class" => class.to_string()
    )
    .record(duration_secs);
}

/// Record one 429 wait, labeled by traffic class.
pub fn record_rate_limited(class: &str) {
    metrics::counter!("robotevents_rate_limited_total", "class" => class.to_string()).increment(1);
}

/// Record one credential quarantined out of rotation.
pub fn record_key_rotation(pool: &str) {
    metrics::counter!("robotevents_key_rotations_total", "pool" => pool.to_string()).increment(1);
}
