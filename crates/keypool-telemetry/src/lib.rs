//! Telemetry for keypool
//!
//! Structured logging via the `tracing` ecosystem and an in-process
//! Prometheus recorder that the server exposes for scraping.

use keypool_config::TelemetryConfig;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Holds the live telemetry handles for the process lifetime
pub struct TelemetryGuard {
    /// Render handle for the metrics endpoint; `None` when metrics are
    /// disabled in config
    pub metrics: Option<PrometheusHandle>,
}

/// Initialize telemetry from configuration
///
/// Installs the global `tracing` subscriber, and the global metrics
/// recorder when metrics are enabled. Call once per process.
///
/// # Errors
///
/// Returns an error if a global subscriber or recorder is already
/// installed.
pub fn init(config: &TelemetryConfig) -> anyhow::Result<TelemetryGuard> {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry().with(filter).with(fmt_layer).try_init()?;

    let metrics = if config.metrics {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {e}"))?;
        Some(handle)
    } else {
        None
    };

    Ok(TelemetryGuard { metrics })
}
