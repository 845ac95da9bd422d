//! Prometheus metrics for tile resolution.

use std::time::Duration;

use anyhow::{Context, Result};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the global Prometheus recorder.
pub fn install_recorder() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")
}

/// Count a finished tile request by outcome
/// (`overlay`, `merged`, `base`, `redirect` or `error`).
pub fn record_tile_outcome(outcome: &'static str) {
    counter!("tile_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_upstream_fetch(success: bool) {
    counter!("upstream_fetches_total").increment(1);
    if !success {
        counter!("upstream_failures_total").increment(1);
    }
}

pub fn record_resolve_duration(elapsed: Duration) {
    histogram!("tile_resolve_duration_ms").record(elapsed.as_secs_f64() * 1000.0);
}
