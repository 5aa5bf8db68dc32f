//! Error types for the scout CLI

/// Errors from CLI startup and configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),
}

/// Result alias for CLI operations.
pub type Result<T> = std::result::Result<T, Error>;
