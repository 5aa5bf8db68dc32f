//! Error types for cache storage operations

/// Errors from cache storage operations.
///
/// Serialization failures never appear here: the cache persists in the
/// background and converts them to logged warnings.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("storage I/O error: {0}")]
    Io(String),
}

/// Result alias for cache storage operations.
pub type Result<T> = std::result::Result<T, Error>;
