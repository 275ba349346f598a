//! Metrics collection and exposition.
//!
//! # Metrics
//! - `mapes_requests_total` (counter): requests by method, status, route
//! - `mapes_request_duration_seconds` (histogram): latency by method, route
//!
//! # Design Decisions
//! - Recording is always on; without an installed recorder the macros are
//!   no-ops, so tests and embedders pay nothing
//! - Route label is the matched pattern, never the raw path, to keep
//!   label cardinality bounded

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one finished request.
pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    let elapsed = start.elapsed().as_secs_f64();

    ::metrics::counter!(
        "mapes_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "route" => route.to_string()
    )
    .increment(1);

    ::metrics::histogram!(
        "mapes_request_duration_seconds",
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(elapsed);
}
