//! HTTP error responses
//!
//! Every failing route returns the same structured JSON body so API
//! consumers can handle errors mechanically:
//! `{"error":{"type":"relay_error","message":"...","request_id":"req_..."}}`.
//! Status mapping: a missing token record is the caller's problem (404),
//! anything that went wrong talking to Fortnox is a gateway failure
//! (502), and internal store/serialization faults are 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Build the structured JSON error response.
pub fn error_response(status: StatusCode, message: &str, request_id: &str) -> Response {
    let body = serde_json::json!({
        "error": {
            "type": "relay_error",
            "message": message,
            "request_id": request_id,
        }
    });
    (
        status,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
        .into_response()
}

/// Status for a failed token exchange on the activation route.
pub fn auth_error_status(error: &fortnox_auth::Error) -> StatusCode {
    use fortnox_auth::Error::*;
    match error {
        NotFound(_) => StatusCode::NOT_FOUND,
        Http(_) | TokenExchange(_) | InvalidGrant(_) => StatusCode::BAD_GATEWAY,
        RecordParse(_) | Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Status for a failed proxied fetch on the orders route.
pub fn api_error_status(error: &fortnox_api::Error) -> StatusCode {
    match error {
        fortnox_api::Error::Auth(inner) => auth_error_status(inner),
        fortnox_api::Error::Http(_)
        | fortnox_api::Error::Provider { .. }
        | fortnox_api::Error::InvalidBody(_) => StatusCode::BAD_GATEWAY,
    }
}
