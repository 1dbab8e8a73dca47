//! Programmatic configuration and pool seeding for integration tests

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use keypool_config::{Config, RelayConfig};
use keypool_core::Provider;
use keypool_state::{KeyRecord, PoolSnapshot};
use secrecy::SecretString;
use tempfile::TempDir;

/// Builder for test configurations backed by a throwaway data dir
pub struct ConfigBuilder {
    config: Config,
    data_dir: TempDir,
}

impl ConfigBuilder {
    /// Create a builder with defaults and a fresh snapshot location
    pub fn new() -> Self {
        let data_dir = tempfile::tempdir().expect("create temp data dir");
        let mut config = Config::default();
        config.server.listen_address = Some(SocketAddr::from(([127, 0, 0, 1], 0)));
        config.pool.data_file = data_dir.path().join("state.json");
        Self { config, data_dir }
    }

    /// Path of the snapshot file this configuration points at
    pub fn data_file(&self) -> PathBuf {
        self.config.pool.data_file.clone()
    }

    /// Require the given admin token on the admin surface
    pub fn with_admin_token(mut self, token: &str) -> Self {
        self.config.server.admin_token = Some(SecretString::from(token));
        self
    }

    /// Cap the per-request attempt budget
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.config.pool.max_attempts = max_attempts;
        self
    }

    /// Route relay-flagged keys through the given base URL
    pub fn with_relay(mut self, base_url: &str) -> Self {
        self.config.relay = Some(RelayConfig {
            enabled: true,
            base_url: base_url.parse().expect("valid relay URL"),
            header: "x-relay-key".to_owned(),
        });
        self
    }

    /// Disable the health endpoint
    pub fn without_health(mut self) -> Self {
        self.config.server.health.enabled = false;
        self
    }

    /// Seed the snapshot file with the given keys before startup
    pub fn with_keys(self, keys: Vec<KeyRecord>) -> Self {
        write_snapshot(
            &self.config.pool.data_file,
            &PoolSnapshot {
                keys,
                ..PoolSnapshot::default()
            },
        );
        self
    }

    /// Build the final config plus the guard keeping the data dir alive
    pub fn build(self) -> (Config, TempDir) {
        (self.config, self.data_dir)
    }
}

/// A pool key pointing at a test backend
pub fn test_key(id: &str, provider: Provider, base_url: &str) -> KeyRecord {
    KeyRecord {
        id: id.to_owned(),
        name: format!("key-{id}"),
        provider,
        secret: format!("sk-{id}-secret-0123456789"),
        base_url: base_url.to_owned(),
        models: Vec::new(),
        enabled: true,
        failures: 0,
        cooldown_until: 0,
        relay: false,
        weight: None,
        created_at: "2026-01-01T00:00:00Z".to_owned(),
        updated_at: "2026-01-01T00:00:00Z".to_owned(),
    }
}

/// Write a snapshot file directly, bypassing the server
pub fn write_snapshot(path: &Path, snapshot: &PoolSnapshot) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create snapshot dir");
    }
    let encoded = serde_json::to_vec_pretty(snapshot).expect("encode snapshot");
    std::fs::write(path, encoded).expect("write snapshot");
}

/// Read the snapshot file back for assertions
pub fn read_snapshot(path: &Path) -> PoolSnapshot {
    let raw = std::fs::read(path).expect("read snapshot");
    serde_json::from_slice(&raw).expect("decode snapshot")
}
