use std::path::PathBuf;

use clap::Parser;

/// Keypool load-balancing proxy
#[derive(Debug, Parser)]
#[command(name = "keypool", about = "Round-robin key-pool proxy for OpenAI-compatible APIs")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "keypool.toml", env = "KEYPOOL_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "KEYPOOL_LISTEN")]
    pub listen: Option<std::net::SocketAddr>,
}
