//! Metrics collection and exposition.
//!
//! # Metrics
//! - `publisher_pending_submissions` (gauge): live registry entries
//! - `publisher_payments_total` (counter): outputs credited to submissions
//! - `publisher_records_observed_total` (counter): decoded records by command
//! - `publisher_assemblies_total` (counter): assemblies by outcome
//! - `publisher_evictions_total` (counter): unpaid submissions evicted

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus exporter. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_pending_submissions(count: usize) {
    metrics::gauge!("publisher_pending_submissions").set(count as f64);
}

pub fn record_payment() {
    metrics::counter!("publisher_payments_total").increment(1);
}

pub fn record_record_observed(command: &'static str) {
    metrics::counter!("publisher_records_observed_total", "command" => command).increment(1);
}

pub fn record_assembly(outcome: &'static str) {
    metrics::counter!("publisher_assemblies_total", "outcome" => outcome).increment(1);
}

pub fn record_evictions(count: usize) {
    metrics::counter!("publisher_evictions_total").increment(count as u64);
}
