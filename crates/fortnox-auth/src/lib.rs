//! Fortnox OAuth token lifecycle
//!
//! Implements the token half of the relay: exchanging an authorization
//! code for an access/refresh token pair, persisting the resulting
//! record in the key-value store, and refreshing it on demand. This
//! crate has no dependency on the HTTP front, so it can be tested and
//! used on its own.
//!
//! Token flow:
//! 1. The activation route receives `code` and `state` from Fortnox
//! 2. `TokenManager::exchange()` POSTs the code to the token endpoint
//! 3. The augmented record (with `expires_at`) is stored under
//!    `oauth-response-{identifier}`
//! 4. The API proxy calls `TokenManager::refresh()` when Fortnox
//!    rejects a request, replacing the record wholesale

pub mod constants;
pub mod error;
pub mod manager;
pub mod record;
pub mod token;

pub use constants::*;
pub use error::{Error, Result};
pub use manager::TokenManager;
pub use record::{TokenRecord, storage_key};
pub use token::{TokenResponse, basic_credentials, exchange_code, refresh_token};
