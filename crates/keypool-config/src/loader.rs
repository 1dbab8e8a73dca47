use std::path::Path;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment
    /// variable expansion fails, TOML parsing fails, or validation
    /// fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        let expanded =
            crate::env::expand_env(&raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if any limit is zero or the relay target is
    /// not an http(s) URL
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.pool.max_attempts == 0 {
            anyhow::bail!("pool.max_attempts must be greater than 0");
        }

        if self.server.body_limit_bytes == 0 {
            anyhow::bail!("server.body_limit_bytes must be greater than 0");
        }

        if !self.server.metrics_path.starts_with('/') {
            anyhow::bail!("server.metrics_path must start with '/'");
        }

        if let Some(ref relay) = self.relay
            && relay.enabled
            && !matches!(relay.base_url.scheme(), "http" | "https")
        {
            anyhow::bail!("relay.base_url must be an http or https URL");
        }

        Ok(())
    }
}
