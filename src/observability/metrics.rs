//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_admissions_total` (counter): streams admitted to the queue
//! - `relay_rejections_total` (counter): producers turned away, by reason
//! - `relay_transfers_total` (counter): finished transfers, by kind and outcome
//! - `relay_bytes_in_total` / `relay_bytes_out_total` (counters): raw and compressed bytes
//! - `relay_transfer_duration_seconds` (histogram): producer drain time
//! - `relay_queue_depth` (gauge): streams waiting for a consumer
//! - `relay_active_transfers` (gauge): transfers currently compressing

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::relay::TransferStats;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_admission(depth: usize) {
    counter!("relay_admissions_total").increment(1);
    set_queue_depth(depth);
}

pub fn record_rejection(reason: &'static str) {
    counter!("relay_rejections_total", "reason" => reason).increment(1);
}

pub fn set_queue_depth(depth: usize) {
    gauge!("relay_queue_depth").set(depth as f64);
}

pub fn set_active_transfers(active: u64) {
    gauge!("relay_active_transfers").set(active as f64);
}

pub fn record_transfer(
    kind: &'static str,
    outcome: &'static str,
    stats: &TransferStats,
    started: Instant,
) {
    counter!("relay_transfers_total", "kind" => kind, "outcome" => outcome).increment(1);
    counter!("relay_bytes_in_total", "kind" => kind).increment(stats.bytes_in);
    counter!("relay_bytes_out_total", "kind" => kind).increment(stats.bytes_out);
    histogram!("relay_transfer_duration_seconds", "kind" => kind)
        .record(started.elapsed().as_secs_f64());
}
