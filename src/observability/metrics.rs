//! Metrics collection and exposition.
//!
//! # Metrics
//! - `mvc_requests_total` (counter): requests by method and status
//! - `mvc_request_duration_seconds` (histogram): dispatch latency
//! - `mvc_route_reloads_total` (counter): route reloads by outcome
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Serve Prometheus metrics on `addr`. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a handled request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    let status = status.to_string();
    counter!(
        "mvc_requests_total",
        "method" => method.to_string(),
        "status" => status.clone()
    )
    .increment(1);
    histogram!(
        "mvc_request_duration_seconds",
        "method" => method.to_string(),
        "status" => status
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record a route table reload attempt.
pub fn record_route_reload(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!("mvc_route_reloads_total", "outcome" => outcome).increment(1);
}
