//! Wire types for the durable pool snapshot
//!
//! Field names follow the snapshot file's camelCase JSON schema.
//! Deserialization is lenient: absent fields take their defaults so a
//! hand-edited or older file still loads.

use keypool_core::Provider;
use serde::{Deserialize, Serialize};

/// Current snapshot schema version
pub const SNAPSHOT_VERSION: u32 = 1;

/// One pooled upstream credential
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRecord {
    /// Opaque unique identifier
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Upstream provider category
    pub provider: Provider,
    /// Upstream credential
    #[serde(rename = "apiKey")]
    pub secret: String,
    /// Absolute base URL, no trailing slash
    pub base_url: String,
    /// Allowed models; empty = unrestricted
    #[serde(default)]
    pub models: Vec<String>,
    /// Whether the key participates in selection
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Consecutive failure count, uncapped
    #[serde(default)]
    pub failures: u32,
    /// Cooldown expiry in epoch millis; 0 = not cooling
    #[serde(default)]
    pub cooldown_until: i64,
    /// Route this key through the relay when relaying is enabled
    #[serde(default)]
    pub relay: bool,
    /// Reserved selection weight; persisted but never consulted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    /// RFC 3339 creation timestamp
    #[serde(default)]
    pub created_at: String,
    /// RFC 3339 last-mutation timestamp
    #[serde(default)]
    pub updated_at: String,
}

/// The full durable pool state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolSnapshot {
    /// Schema version
    #[serde(default = "default_version")]
    pub version: u32,
    /// Monotonically increasing round-robin cursor
    ///
    /// Not an index into `keys`: it is reduced modulo the eligible
    /// subset size at selection time.
    #[serde(default)]
    pub rr_index: i64,
    /// Insertion-ordered key list
    #[serde(default)]
    pub keys: Vec<KeyRecord>,
}

impl Default for PoolSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            rr_index: 0,
            keys: Vec::new(),
        }
    }
}

impl PoolSnapshot {
    /// Find a key by id
    pub fn key(&self, id: &str) -> Option<&KeyRecord> {
        self.keys.iter().find(|k| k.id == id)
    }

    /// Find a key by id, mutably
    pub fn key_mut(&mut self, id: &str) -> Option<&mut KeyRecord> {
        self.keys.iter_mut().find(|k| k.id == id)
    }
}

const fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

#[allow(clippy::missing_const_for_fn)]
fn default_enabled() -> bool {
    true
}
