//! OAuth token exchange and refresh
//!
//! Handles the two token endpoint interactions:
//! 1. Authorization code exchange (initial activation)
//! 2. Token refresh (request-time, when Fortnox rejects a call)
//!
//! Both operations POST a form-encoded body to the token endpoint with a
//! `Basic` authorization header carrying the base64 of
//! `client_id:client_secret`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Response from the token endpoint for both exchange and refresh.
///
/// `expires_in` is a delta in seconds from the response time. The caller
/// converts this to an absolute unix millisecond timestamp when storing
/// the record.
#[derive(Debug, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub scope: String,
    /// Seconds until the access token expires (delta, not absolute)
    pub expires_in: u64,
    pub token_type: String,
}

/// Build the Basic credentials for the token endpoint: base64 of
/// `client_id:client_secret`.
pub fn basic_credentials(client_id: &str, client_secret: &str) -> String {
    BASE64.encode(format!("{client_id}:{client_secret}"))
}

/// Exchange an authorization code for tokens (initial activation).
///
/// Fortnox redirected the user back with the authorization code; we
/// trade it for an access/refresh token pair, proving our identity with
/// the Basic credentials and the registered redirect URI.
pub async fn exchange_code(
    client: &reqwest::Client,
    token_endpoint: &str,
    credentials: &str,
    code: &str,
    redirect_uri: &str,
) -> Result<TokenResponse> {
    let response = client
        .post(token_endpoint)
        .header(reqwest::header::AUTHORIZATION, format!("Basic {credentials}"))
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token exchange request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        return Err(Error::TokenExchange(format!(
            "token endpoint returned {status}: {body}"
        )));
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::TokenExchange(format!("invalid token response: {e}")))
}

/// Refresh an access token using a refresh token.
///
/// Called by the API proxy when Fortnox rejects a request. The previous
/// access token is invalidated; the caller must store the new pair.
pub async fn refresh_token(
    client: &reqwest::Client,
    token_endpoint: &str,
    credentials: &str,
    refresh: &str,
) -> Result<TokenResponse> {
    let response = client
        .post(token_endpoint)
        .header(reqwest::header::AUTHORIZATION, format!("Basic {credentials}"))
        .form(&[("grant_type", "refresh_token"), ("refresh_token", refresh)])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));

        // 400/401/403 means the refresh token is spent, revoked or invalid
        if matches!(status.as_u16(), 400 | 401 | 403) {
            return Err(Error::InvalidGrant(format!(
                "refresh token rejected ({status}): {body}"
            )));
        }

        return Err(Error::TokenExchange(format!(
            "token refresh returned {status}: {body}"
        )));
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::TokenExchange(format!("invalid refresh response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_response_deserializes() {
        let json = r#"{"access_token":"xyz","refresh_token":"a7302e6b","scope":"companyinformation","expires_in":3600,"token_type":"Bearer"}"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.access_token, "xyz");
        assert_eq!(token.refresh_token, "a7302e6b");
        assert_eq!(token.scope, "companyinformation");
        assert_eq!(token.expires_in, 3600);
        assert_eq!(token.token_type, "Bearer");
    }

    #[test]
    fn basic_credentials_matches_documented_example() {
        // Vector from the Fortnox integration docs
        assert_eq!(
            basic_credentials("8VurtMGDTeAI", "yFKwme8LEQ"),
            "OFZ1cnRNR0RUZUFJOnlGS3dtZThMRVE="
        );
    }

    #[tokio::test]
    async fn exchange_code_surfaces_transport_failure() {
        // Nothing listens on port 1 — the request must fail as Http, not panic
        let client = reqwest::Client::new();
        let result = exchange_code(
            &client,
            "http://127.0.0.1:1/oauth-v1/token",
            "Y3JlZHM=",
            "abc",
            "https://example.org/activation",
        )
        .await;
        assert!(matches!(result, Err(Error::Http(_))));
    }

    #[tokio::test]
    async fn refresh_token_surfaces_transport_failure() {
        let client = reqwest::Client::new();
        let result =
            refresh_token(&client, "http://127.0.0.1:1/oauth-v1/token", "Y3JlZHM=", "rt").await;
        assert!(matches!(result, Err(Error::Http(_))));
    }
}
