//! Error types for request execution

/// Errors from request execution.
///
/// Rate limiting never appears here: 429 responses are absorbed inside the
/// executor by waiting out `Retry-After` and reissuing the request. What
/// surfaces is terminal for the request that raised it; callers are
/// expected to degrade to an empty result rather than crash.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("authentication failed after {attempts} attempts: every available credential was rejected")]
    AuthExhausted { attempts: usize },

    #[error("upstream returned HTTP {status}")]
    Http { status: u16, body: String },

    #[error("response parse error: {0}")]
    Parse(String),

    #[error("invalid request URL: {0}")]
    Url(String),

    #[error("network error: {0}")]
    Network(String),
}

/// Result alias for request execution.
pub type Result<T> = std::result::Result<T, Error>;
