//! Fortnox OAuth relay
//!
//! Single-binary service that:
//! 1. Receives the OAuth activation callback and exchanges the
//!    authorization code for a token record
//! 2. Persists token material per caller-supplied identifier
//! 3. Proxies read requests to the Fortnox REST API, refreshing the
//!    token once when a call is rejected

mod config;
mod error;
mod metrics;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use fortnox_api::{ApiClient, Throttle};
use fortnox_auth::TokenManager;
use kv_store::KvStore;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    manager: Arc<TokenManager>,
    api: Arc<ApiClient>,
    store: Arc<KvStore>,
    prometheus: PrometheusHandle,
    resource_id: String,
    requests_total: Arc<AtomicU64>,
    started_at: Instant,
}

/// Build the axum router with all routes and shared state.
fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/api/oauth/activation", get(activation_handler))
        .route("/api/orders", get(orders_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting fortnox-relay");

    // Install the Prometheus recorder before any metrics are emitted
    let prometheus = metrics::install_recorder();

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        listen_addr = %config.server.listen_addr,
        token_endpoint = %config.provider.token_endpoint,
        api_base = %config.provider.api_base,
        rate_limit = config.provider.rate_limit,
        store_path = %config.storage.store_path.display(),
        "configuration loaded"
    );

    let store = Arc::new(
        KvStore::open(config.storage.store_path.clone())
            .await
            .context("failed to open key-value store")?,
    );

    let client = reqwest::Client::new();
    let manager = Arc::new(TokenManager::new(
        client.clone(),
        store.clone(),
        config.provider.token_endpoint.clone(),
        &config.credentials.client_id,
        config.credentials.client_secret.expose(),
        config.credentials.redirect_uri.clone(),
    ));
    let throttle = Arc::new(Throttle::new(config.provider.rate_limit));
    let api = Arc::new(ApiClient::new(
        client,
        manager.clone(),
        throttle,
        config.provider.api_base.clone(),
        config.storage.dump_path.clone(),
    ));

    let state = AppState {
        manager,
        api,
        store,
        prometheus,
        resource_id: config.provider.resource_id.clone(),
        requests_total: Arc::new(AtomicU64::new(0)),
        started_at: Instant::now(),
    };

    let app = build_router(state, config.server.max_connections);

    let listener = TcpListener::bind(config.server.listen_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.server.listen_addr))?;

    info!(addr = %config.server.listen_addr, "accepting requests");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

fn new_request_id() -> String {
    format!("req_{}", uuid::Uuid::new_v4().as_simple())
}

async fn root_handler() -> &'static str {
    "Fortnox relay"
}

#[derive(Deserialize)]
struct ActivationParams {
    code: String,
    state: String,
}

/// Activation callback: exchange the authorization code and report the
/// real outcome. The original integration answered 200 before the
/// exchange ran; here the caller learns whether activation actually
/// succeeded.
async fn activation_handler(
    State(state): State<AppState>,
    Query(params): Query<ActivationParams>,
) -> Response {
    let request_id = new_request_id();
    let started = Instant::now();
    state.requests_total.fetch_add(1, Ordering::Relaxed);

    match state.manager.exchange(&params.code, &params.state).await {
        Ok(record) => {
            info!(
                identifier = %params.state,
                expires_at = record.expires_at,
                request_id,
                "activation complete"
            );
            metrics::record_exchange("success");
            metrics::record_request("activation", 200, started.elapsed().as_secs_f64());
            StatusCode::OK.into_response()
        }
        Err(e) => {
            warn!(identifier = %params.state, error = %e, request_id, "activation failed");
            metrics::record_exchange("failure");
            let status = error::auth_error_status(&e);
            metrics::record_request("activation", status.as_u16(), started.elapsed().as_secs_f64());
            error::error_response(status, &format!("token exchange failed: {e}"), &request_id)
        }
    }
}

#[derive(Deserialize)]
struct OrdersParams {
    user_id: String,
}

/// Proxy the orders resource for a stored identifier.
async fn orders_handler(
    State(state): State<AppState>,
    Query(params): Query<OrdersParams>,
) -> Response {
    let request_id = new_request_id();
    let started = Instant::now();
    state.requests_total.fetch_add(1, Ordering::Relaxed);

    match state
        .api
        .fetch("orders", &state.resource_id, &params.user_id)
        .await
    {
        Ok(payload) => {
            metrics::record_request("orders", 200, started.elapsed().as_secs_f64());
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(e) => {
            warn!(identifier = %params.user_id, error = %e, request_id, "orders fetch failed");
            let status = error::api_error_status(&e);
            metrics::record_request("orders", status.as_u16(), started.elapsed().as_secs_f64());
            error::error_response(status, &format!("orders fetch failed: {e}"), &request_id)
        }
    }
}

/// Liveness report: uptime, stored identifiers and requests served.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let body = serde_json::json!({
        "status": "ok",
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "identifiers_stored": state.store.len().await,
        "requests_served": state.requests_total.load(Ordering::Relaxed),
    });
    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// Prometheus metrics endpoint in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
