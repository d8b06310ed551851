//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Install the Prometheus recorder and scrape listener
//! - Give each subsystem a typed recording function
//!
//! # Metrics
//! - `eds_reconcile_ticks_total{outcome}` (counter): reconcile ticks by outcome
//! - `eds_registry_fetch_duration_seconds{status}` (histogram): device list fetch latency
//! - `eds_snapshot_version{node}` (gauge): latest published version per node
//! - `eds_localities` (gauge): localities in the latest published assignment
//! - `eds_discovery_requests_total{type,status}` (counter): discovery responses by type and HTTP status
//!
//! Recording before [`init_metrics`] is a no-op, so tests and the CLI never
//! install a recorder.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Registry calls are bounded by a timeout of a few seconds.
const FETCH_LATENCY_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets(FETCH_LATENCY_BUCKETS)?
        .install()?;

    describe_counter!("eds_reconcile_ticks_total", "Reconcile ticks by outcome");
    describe_histogram!(
        "eds_registry_fetch_duration_seconds",
        "Device registry fetch latency in seconds"
    );
    describe_gauge!("eds_snapshot_version", "Latest published snapshot version per node");
    describe_gauge!("eds_localities", "Localities in the latest published assignment");
    describe_counter!(
        "eds_discovery_requests_total",
        "Discovery responses by resource type and status"
    );

    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_reconcile(outcome: &'static str) {
    counter!("eds_reconcile_ticks_total", "outcome" => outcome).increment(1);
}

pub fn record_registry_fetch(ok: bool, start: Instant) {
    let status = if ok { "ok" } else { "error" };
    histogram!("eds_registry_fetch_duration_seconds", "status" => status)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_snapshot_version(node: &str, version: u64) {
    gauge!("eds_snapshot_version", "node" => node.to_string()).set(version as f64);
}

pub fn record_localities(count: usize) {
    gauge!("eds_localities").set(count as f64);
}

pub fn record_discovery_request(type_name: &'static str, status: u16) {
    counter!(
        "eds_discovery_requests_total",
        "type" => type_name,
        "status" => status.to_string()
    )
    .increment(1);
}
