//! Persisted token record

use serde::{Deserialize, Serialize};

use crate::constants::STORAGE_KEY_PREFIX;
use crate::token::TokenResponse;

/// A token endpoint response augmented with its absolute expiry.
///
/// `expires_at` is a unix timestamp in milliseconds, computed at storage
/// time as now + `expires_in` seconds. Records are replaced wholesale on
/// refresh; no historical versions are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    pub refresh_token: String,
    pub scope: String,
    pub expires_in: u64,
    pub token_type: String,
    /// Expiration as unix timestamp in milliseconds
    pub expires_at: u64,
}

impl TokenRecord {
    /// Augment a token endpoint response with its absolute expiry.
    pub fn from_response(response: TokenResponse, now_millis: u64) -> Self {
        let expires_at = now_millis + response.expires_in * 1000;
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            scope: response.scope,
            expires_in: response.expires_in,
            token_type: response.token_type,
            expires_at,
        }
    }
}

/// Store key scoping a token record to one identifier.
pub fn storage_key(identifier: &str) -> String {
    format!("{STORAGE_KEY_PREFIX}{identifier}")
}
