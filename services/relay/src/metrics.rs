//! Prometheus metrics exposition
//!
//! Registers and exposes the relay's metrics:
//!
//! - `relay_requests_total` (counter): labels `route`, `status`
//! - `relay_request_duration_seconds` (histogram): label `route`
//! - `relay_token_exchanges_total` (counter): label `outcome`
//! - `relay_token_refreshes_total` (counter, emitted by fortnox-auth):
//!   label `outcome`

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering.
///
/// The duration histogram gets explicit buckets so it renders with
/// `_bucket` lines usable by `histogram_quantile()` rather than the
/// default summary.
pub fn install_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full(
                "relay_request_duration_seconds".to_string(),
            ),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0],
        )
        .expect("failed to set histogram buckets")
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Record a completed request with route and status labels.
pub fn record_request(route: &str, status: u16, duration_secs: f64) {
    metrics::counter!(
        "relay_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string(),
    )
    .increment(1);
    metrics::histogram!("relay_request_duration_seconds", "route" => route.to_string())
        .record(duration_secs);
}

/// Record a token exchange outcome ("success" or "failure").
pub fn record_exchange(outcome: &str) {
    metrics::counter!("relay_token_exchanges_total", "outcome" => outcome.to_string())
        .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusRecorder;

    #[test]
    fn record_functions_are_noops_without_a_recorder() {
        record_request("orders", 200, 0.05);
        record_exchange("failure");
    }

    /// Isolated recorder/handle pair; install_recorder() panics if a
    /// global recorder already exists, which it may in parallel tests.
    fn isolated_recorder() -> (PrometheusRecorder, PrometheusHandle) {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        (recorder, handle)
    }

    #[test]
    fn record_request_writes_counter_with_labels() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_request("orders", 200, 0.042);
        record_request("activation", 502, 0.8);

        let output = handle.render();
        assert!(output.contains("relay_requests_total"), "got:\n{output}");
        assert!(output.contains("route=\"orders\""));
        assert!(output.contains("status=\"200\""));
        assert!(output.contains("route=\"activation\""));
        assert!(output.contains("status=\"502\""));
    }

    #[test]
    fn record_exchange_writes_outcome_label() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_exchange("success");
        record_exchange("failure");

        let output = handle.render();
        assert!(output.contains("relay_token_exchanges_total"));
        assert!(output.contains("outcome=\"success\""));
        assert!(output.contains("outcome=\"failure\""));
    }
}
