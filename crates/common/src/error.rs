//! Shared configuration error type

use thiserror::Error;

/// Errors raised while assembling service configuration.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing environment variable: {0}")]
    Env(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result alias using the shared Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_context() {
        let err = Error::Config("rate_limit must be greater than 0".into());
        assert_eq!(
            err.to_string(),
            "Configuration error: rate_limit must be greater than 0"
        );

        let err = Error::Env("CLIENT_SECRET".into());
        assert_eq!(err.to_string(), "Missing environment variable: CLIENT_SECRET");
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io.into();
        assert!(err.to_string().starts_with("I/O error:"), "got: {err}");
    }

    #[test]
    fn debug_names_the_variant() {
        let err = Error::Env("CLIENT_ID".into());
        let debug = format!("{err:?}");
        assert!(debug.contains("Env"), "got: {debug}");
    }
}
