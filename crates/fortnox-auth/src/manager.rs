//! Token manager: exchange, refresh and record storage
//!
//! Owns the HTTP client, the store handle and the provider credentials,
//! all passed in at construction. A per-identifier async lock serializes
//! the read-modify-write sequences (exchange, refresh) so two concurrent
//! refreshes for the same identifier cannot clobber each other's record;
//! distinct identifiers never contend.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use common::Secret;
use kv_store::KvStore;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::record::{TokenRecord, storage_key};
use crate::token;

/// Manages the token lifecycle for every identifier.
///
/// The store is the sole authority for token records; the manager holds
/// no record cache of its own.
pub struct TokenManager {
    client: reqwest::Client,
    store: Arc<KvStore>,
    token_endpoint: String,
    credentials: Secret<String>,
    redirect_uri: String,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TokenManager {
    /// Build a manager for the given endpoint and client credentials.
    ///
    /// The Basic credentials are derived once here; the raw secret is not
    /// retained.
    pub fn new(
        client: reqwest::Client,
        store: Arc<KvStore>,
        token_endpoint: String,
        client_id: &str,
        client_secret: &str,
        redirect_uri: String,
    ) -> Self {
        let credentials = Secret::new(token::basic_credentials(client_id, client_secret));
        Self {
            client,
            store,
            token_endpoint,
            credentials,
            redirect_uri,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Exchange an authorization code for a token record and store it
    /// under the identifier's key. Returns the stored record.
    pub async fn exchange(&self, code: &str, identifier: &str) -> Result<TokenRecord> {
        let lock = self.lock_for(identifier).await;
        let _guard = lock.lock().await;

        debug!(identifier, "exchanging authorization code");
        let response = token::exchange_code(
            &self.client,
            &self.token_endpoint,
            self.credentials.expose(),
            code,
            &self.redirect_uri,
        )
        .await?;

        let record = TokenRecord::from_response(response, now_millis());
        self.put(identifier, &record).await?;
        info!(identifier, expires_at = record.expires_at, "token record stored");
        Ok(record)
    }

    /// Refresh the identifier's token record in place.
    ///
    /// Fails with `NotFound` when no record exists; there is nothing to
    /// refresh. On success the prior record is overwritten wholesale and
    /// the new one returned.
    pub async fn refresh(&self, identifier: &str) -> Result<TokenRecord> {
        let lock = self.lock_for(identifier).await;
        let _guard = lock.lock().await;

        let current = self.read(identifier).await?;
        debug!(identifier, "refreshing token record");
        let response = match token::refresh_token(
            &self.client,
            &self.token_endpoint,
            self.credentials.expose(),
            &current.refresh_token,
        )
        .await
        {
            Ok(response) => {
                metrics::counter!("relay_token_refreshes_total", "outcome" => "success")
                    .increment(1);
                response
            }
            Err(e) => {
                metrics::counter!("relay_token_refreshes_total", "outcome" => "failure")
                    .increment(1);
                return Err(e);
            }
        };

        let record = TokenRecord::from_response(response, now_millis());
        self.put(identifier, &record).await?;
        info!(identifier, expires_at = record.expires_at, "token record refreshed");
        Ok(record)
    }

    /// Load the identifier's current token record.
    pub async fn load(&self, identifier: &str) -> Result<TokenRecord> {
        self.read(identifier).await
    }

    async fn read(&self, identifier: &str) -> Result<TokenRecord> {
        let bytes = self
            .store
            .get(&storage_key(identifier))
            .await
            .ok_or_else(|| Error::NotFound(format!("no token record for identifier {identifier}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::RecordParse(format!("stored record for {identifier}: {e}")))
    }

    async fn put(&self, identifier: &str, record: &TokenRecord) -> Result<()> {
        let bytes = serde_json::to_vec(record)
            .map_err(|e| Error::RecordParse(format!("serializing record: {e}")))?;
        self.store
            .set(&storage_key(identifier), bytes)
            .await
            .map_err(|e| Error::Store(e.to_string()))
    }

    async fn lock_for(&self, identifier: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(identifier.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
