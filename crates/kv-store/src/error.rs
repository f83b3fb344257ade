//! Error types for store operations

/// Errors from key-value store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("store file parse error: {0}")]
    Parse(String),
}

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;
