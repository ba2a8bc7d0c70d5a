//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define intake metrics (outcomes, framing attempts, latency, sessions)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `intake_connections_total` (counter): accept cycles by listener, outcome
//! - `intake_frame_attempts_total` (counter): framing attempts by result
//! - `intake_frame_duration_seconds` (histogram): accept-to-outcome latency
//! - `intake_active_sessions` (gauge): handed-off connections still open
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so the core and its
//!   tests run without an exporter

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_outcome(listener: &str, outcome: &'static str) {
    counter!(
        "intake_connections_total",
        "listener" => listener.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_frame_attempt(result: &'static str) {
    counter!("intake_frame_attempts_total", "result" => result).increment(1);
}

pub fn record_frame_duration(elapsed: Duration) {
    histogram!("intake_frame_duration_seconds").record(elapsed.as_secs_f64());
}

#[allow(clippy::cast_precision_loss)]
pub fn record_active_sessions(active: u64) {
    gauge!("intake_active_sessions").set(active as f64);
}
