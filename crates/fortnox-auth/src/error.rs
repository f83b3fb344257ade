//! Error types for token lifecycle operations

/// Errors from token exchange, refresh and record storage.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("grant rejected: {0}")]
    InvalidGrant(String),

    #[error("token record parse error: {0}")]
    RecordParse(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("not found: {0}")]
    NotFound(String),
}

/// Result alias for token lifecycle operations.
pub type Result<T> = std::result::Result<T, Error>;
