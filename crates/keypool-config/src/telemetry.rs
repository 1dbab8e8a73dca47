use serde::Deserialize;

/// Telemetry configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    /// `tracing-subscriber` env-filter directive
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Whether to install the Prometheus recorder
    #[serde(default = "default_metrics_enabled")]
    pub metrics: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            metrics: default_metrics_enabled(),
        }
    }
}

fn default_log_filter() -> String {
    "info".to_owned()
}

#[allow(clippy::missing_const_for_fn)]
fn default_metrics_enabled() -> bool {
    true
}
