//! Prometheus metrics for sweeps.
//!
//! A sweep is a one-shot process, so nothing is scraped live. When metrics are
//! enabled the rendered exposition is written to a textfile at the end of the
//! run for the node exporter's textfile collector to pick up.
//!
//! Metrics:
//! - `sweep_records_total{mode, outcome}`: record outcomes (completed, skipped, failed)
//! - `sweep_pages_total`: listing pages processed
//! - `sweep_runs_total{reason}`: finished sweeps by terminal reason, or `fatal`
//! - `sweep_action_duration_seconds{mode}`: time spent per record action

#[cfg(feature = "prometheus")]
use std::sync::OnceLock;

#[cfg(feature = "prometheus")]
use metrics::{counter, histogram};
#[cfg(feature = "prometheus")]
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::MetricsConfig;

#[cfg(feature = "prometheus")]
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder if metrics are enabled.
#[cfg(feature = "prometheus")]
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        return Ok(());
    }

    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Suffix("_duration_seconds".to_string()),
            &seconds_from_ms(&config.latency_buckets_ms),
        )
        .map_err(|e| MetricsError::Setup(e.to_string()))?;

    let handle = builder.install_recorder().map_err(MetricsError::Install)?;

    PROMETHEUS_HANDLE
        .set(handle)
        .map_err(|_| MetricsError::Setup("Metrics already initialized".to_string()))?;

    Ok(())
}

/// Install the Prometheus recorder (no-op without prometheus feature).
#[cfg(not(feature = "prometheus"))]
pub fn init_metrics(_config: &MetricsConfig) -> Result<(), MetricsError> {
    Ok(())
}

#[cfg(feature = "prometheus")]
fn seconds_from_ms(ms_buckets: &[f64]) -> Vec<f64> {
    ms_buckets.iter().map(|ms| ms / 1000.0).collect()
}

/// Write the rendered metrics to `textfile_path`.
///
/// Returns `false` without touching the filesystem when metrics are disabled,
/// no path is configured, or the recorder was never installed. The file is
/// written next to its destination and renamed so the collector never reads
/// a partial exposition.
pub fn write_textfile(config: &MetricsConfig) -> Result<bool, MetricsError> {
    #[cfg(feature = "prometheus")]
    {
        let (true, Some(path)) = (config.enabled, config.textfile_path.as_deref()) else {
            return Ok(false);
        };
        let Some(handle) = PROMETHEUS_HANDLE.get() else {
            return Ok(false);
        };
        let temp_path = format!("{path}.tmp");
        std::fs::write(&temp_path, handle.render())?;
        std::fs::rename(&temp_path, path)?;
        Ok(true)
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = config;
        Ok(false)
    }
}

/// Record the outcome and duration of one record action.
///
/// # Arguments
/// * `mode` - The sweep mode ("erase" or "archive")
/// * `outcome` - "completed", "skipped" or "failed"
/// * `duration_secs` - Wall-clock time of the action
pub fn record_action(mode: &str, outcome: &str, duration_secs: f64) {
    #[cfg(feature = "prometheus")]
    {
        counter!(
            "sweep_records_total",
            "mode" => mode.to_string(),
            "outcome" => outcome.to_string()
        )
        .increment(1);
        histogram!("sweep_action_duration_seconds", "mode" => mode.to_string())
            .record(duration_secs);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (mode, outcome, duration_secs);
    }
}

/// Record a processed listing page.
pub fn record_page() {
    #[cfg(feature = "prometheus")]
    {
        counter!("sweep_pages_total").increment(1);
    }
}

/// Record a finished sweep.
///
/// # Arguments
/// * `reason` - The terminal reason, or "fatal" when the sweep aborted
pub fn record_run(reason: &str) {
    #[cfg(feature = "prometheus")]
    {
        counter!("sweep_runs_total", "reason" => reason.to_string()).increment(1);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = reason;
    }
}

/// Metrics setup and export errors.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Failed to set up metrics: {0}")]
    Setup(String),

    #[cfg(feature = "prometheus")]
    #[error("Failed to install metrics recorder: {0}")]
    Install(#[from] metrics_exporter_prometheus::BuildError),

    #[error("Failed to write metrics textfile: {0}")]
    Io(#[from] std::io::Error),
}
