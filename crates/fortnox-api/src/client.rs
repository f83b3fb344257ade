//! Proxied resource fetches
//!
//! `ApiClient` is the request-path collaborator of the HTTP front: it
//! turns a (route, resource id, identifier) triple into a throttled,
//! bearer-authenticated GET against the Fortnox API, with a single
//! refresh-and-retry when the provider rejects the first attempt.

use std::path::PathBuf;
use std::sync::Arc;

use fortnox_auth::TokenManager;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::throttle::Throttle;

/// Fetches named resources from the Fortnox API for stored identifiers.
pub struct ApiClient {
    client: reqwest::Client,
    manager: Arc<TokenManager>,
    throttle: Arc<Throttle>,
    api_base: String,
    /// Diagnostic dump target, overwritten on each successful fetch.
    /// `None` disables dumping entirely.
    dump_path: Option<PathBuf>,
}

impl ApiClient {
    pub fn new(
        client: reqwest::Client,
        manager: Arc<TokenManager>,
        throttle: Arc<Throttle>,
        api_base: String,
        dump_path: Option<PathBuf>,
    ) -> Self {
        Self {
            client,
            manager,
            throttle,
            api_base,
            dump_path,
        }
    }

    /// Fetch `{api_base}/{route}/{resource_id}` on behalf of `identifier`.
    ///
    /// Fails if no token record exists. On any non-200 first attempt the
    /// token is refreshed exactly once and the GET retried once; that
    /// retry's outcome is final, success or failure.
    pub async fn fetch(
        &self,
        route: &str,
        resource_id: &str,
        identifier: &str,
    ) -> Result<serde_json::Value> {
        let record = self.manager.load(identifier).await?;
        let url = self.resource_url(route, resource_id);

        self.throttle.acquire().await;
        let response = self.get(&url, &record.access_token).await?;
        if response.status().is_success() {
            return self.finish(response).await;
        }

        let status = response.status();
        debug!(identifier, route, %status, "provider rejected fetch, refreshing token");

        let record = self.manager.refresh(identifier).await?;
        self.throttle.acquire().await;
        let response = self.get(&url, &record.access_token).await?;
        if response.status().is_success() {
            return self.finish(response).await;
        }

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        Err(Error::Provider { status, body })
    }

    fn resource_url(&self, route: &str, resource_id: &str) -> String {
        format!(
            "{}/{route}/{resource_id}",
            self.api_base.trim_end_matches('/')
        )
    }

    async fn get(&self, url: &str, access_token: &str) -> Result<reqwest::Response> {
        self.client
            .get(url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {access_token}"),
            )
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| Error::Http(format!("provider request failed: {e}")))
    }

    /// Parse a successful response and dump it for diagnostics.
    async fn finish(&self, response: reqwest::Response) -> Result<serde_json::Value> {
        let payload = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| Error::InvalidBody(e.to_string()))?;
        self.dump(&payload).await;
        Ok(payload)
    }

    /// Best-effort write of the last successful payload. Failures are
    /// logged and never fail the fetch.
    async fn dump(&self, payload: &serde_json::Value) {
        let Some(path) = &self.dump_path else {
            return;
        };
        let pretty = match serde_json::to_string_pretty(payload) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "skipping response dump");
                return;
            }
        };
        if let Some(parent) = path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                warn!(path = %path.display(), error = %e, "failed to create dump directory");
                return;
            }
        }
        if let Err(e) = tokio::fs::write(path, pretty).await {
            warn!(path = %path.display(), error = %e, "failed to write response dump");
        }
    }
}
