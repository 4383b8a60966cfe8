//! Prometheus metrics setup and metric definitions

use anyhow::Context;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Edge outcomes recorded by the gateway
pub const EDGE_OUTCOMES: &[&str] = &[
    "invoked",
    "not_found",
    "method_not_allowed",
    "unauthorized",
    "forbidden",
    "invalid",
    "error",
];

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_prometheus_recorder() -> anyhow::Result<PrometheusHandle> {
    // Seconds. Edge decisions are fast, handler calls are not.
    let buckets = [
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];

    PrometheusBuilder::new()
        .set_buckets(&buckets)
        .context("failed to set histogram buckets")?
        .install_recorder()
        .context("failed to install Prometheus recorder")
}

/// Register metric descriptions and emit zero values so HELP/TYPE lines
/// appear from startup.
pub fn describe_metrics() {
    describe_counter!("ecommerce_http_requests_total", "Total number of HTTP requests");
    describe_histogram!(
        "ecommerce_http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_gauge!(
        "ecommerce_http_requests_in_flight",
        "Number of HTTP requests currently being processed"
    );
    describe_counter!(
        "ecommerce_edge_requests_total",
        "Edge decisions by outcome (invoked, rejected by routing, authorization or validation)"
    );

    for outcome in EDGE_OUTCOMES {
        counter!("ecommerce_edge_requests_total", "outcome" => *outcome).absolute(0);
    }
    gauge!("ecommerce_http_requests_in_flight").set(0.0);
}
