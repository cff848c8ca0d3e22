//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lb_backend_alive` (gauge): 1=alive, 0=dead, per backend
//! - `lb_forward_failures_total` (counter): transport failures, per backend
//! - `lb_backend_marked_dead_total` (counter): retry budget exhaustions, per backend
//! - `lb_requests_total` (counter): dispatch outcomes (`success`, `no_live_peer`, `attempts_exhausted`)
//!
//! Updates go through the `metrics` facade and are no-ops until a recorder is
//! installed with [`init_metrics`].

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_backend_alive(backend: &str, alive: bool) {
    metrics::gauge!("lb_backend_alive", "backend" => backend.to_string())
        .set(if alive { 1.0 } else { 0.0 });
}

pub fn record_forward_failure(backend: &str) {
    metrics::counter!("lb_forward_failures_total", "backend" => backend.to_string()).increment(1);
}

pub fn record_marked_dead(backend: &str) {
    metrics::counter!("lb_backend_marked_dead_total", "backend" => backend.to_string()).increment(1);
}

pub fn record_outcome(outcome: &'static str) {
    metrics::counter!("lb_requests_total", "outcome" => outcome).increment(1);
}
