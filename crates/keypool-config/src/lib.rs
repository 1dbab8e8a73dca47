//! Configuration for keypool
//!
//! Loaded from a TOML file with `{{ env.VAR }}` placeholder expansion,
//! deserialized with strict field checking, then validated.

#![allow(clippy::must_use_candidate)]

mod env;
mod loader;
pub mod pool;
pub mod relay;
pub mod server;
pub mod telemetry;

use serde::Deserialize;

pub use pool::PoolConfig;
pub use relay::RelayConfig;
pub use server::{HealthConfig, ServerConfig};
pub use telemetry::TelemetryConfig;

/// Top-level keypool configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Key pool configuration
    #[serde(default)]
    pub pool: PoolConfig,
    /// Optional relay indirection
    #[serde(default)]
    pub relay: Option<RelayConfig>,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}
