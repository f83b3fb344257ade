//! Fortnox OAuth defaults
//!
//! Default endpoints for the Fortnox OAuth application. These are plain
//! defaults, not ambient state: the service config may override any of
//! them, and the client id/secret always come from the environment.

/// Token endpoint for code exchange and token refresh
pub const TOKEN_ENDPOINT: &str = "https://apps.fortnox.se/oauth-v1/token";

/// Base URL of the Fortnox REST API (version segment included)
pub const API_BASE: &str = "https://api.fortnox.se/3";

/// Prefix of the store key scoping a token record to one identifier
pub const STORAGE_KEY_PREFIX: &str = "oauth-response-";
