//! Error types for proxied API calls

/// Errors from fetching a Fortnox resource.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Auth(#[from] fortnox_auth::Error),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("invalid provider response body: {0}")]
    InvalidBody(String),
}

/// Result alias for proxied API calls.
pub type Result<T> = std::result::Result<T, Error>;
