use serde::Deserialize;
use url::Url;

/// Optional relay indirection for upstream calls
///
/// When enabled, keys flagged with `relay` are dispatched to the relay
/// base URL instead of their own, with the key's secret additionally
/// injected under `header`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Base URL requests are redirected to
    pub base_url: Url,
    /// Header carrying the original key secret
    #[serde(default = "default_relay_header")]
    pub header: String,
}

fn default_relay_header() -> String {
    "x-relay-key".to_owned()
}
