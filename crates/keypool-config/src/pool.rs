use std::path::PathBuf;

use serde::Deserialize;

/// Key pool configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    /// Durable snapshot file
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
    /// Cap on upstream attempts per inbound request
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_data_file() -> PathBuf {
    PathBuf::from("data/state.json")
}

const fn default_max_attempts() -> usize {
    8
}
