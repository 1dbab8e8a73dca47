use std::net::SocketAddr;

use secrecy::SecretString;
use serde::Deserialize;

/// HTTP server configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Listen address (defaults to 0.0.0.0:8787)
    pub listen_address: Option<SocketAddr>,
    /// Shared secret for the admin surface; admin routes are open when unset
    #[serde(default)]
    pub admin_token: Option<SecretString>,
    /// Maximum accepted inbound body size in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
    /// Path serving the Prometheus exposition
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,
    /// Liveness endpoint configuration
    #[serde(default)]
    pub health: HealthConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: None,
            admin_token: None,
            body_limit_bytes: default_body_limit(),
            metrics_path: default_metrics_path(),
            health: HealthConfig::default(),
        }
    }
}

/// Liveness endpoint configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HealthConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_health_path")]
    pub path: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_health_path(),
        }
    }
}

const fn default_body_limit() -> usize {
    20 * 1024 * 1024
}

fn default_metrics_path() -> String {
    "/metrics".to_owned()
}

#[allow(clippy::missing_const_for_fn)]
fn default_enabled() -> bool {
    true
}

fn default_health_path() -> String {
    "/health".to_owned()
}
