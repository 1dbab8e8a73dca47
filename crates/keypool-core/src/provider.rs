//! Closed provider enumeration and its presets
//!
//! Every upstream credential belongs to exactly one provider. The
//! enumeration is closed so eligibility filtering and path rewriting
//! stay exhaustive; third-party OpenAI-compatible endpoints go under
//! [`Provider::Custom`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Upstream API category with an associated base-URL/path convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// OpenAI API
    Openai,
    /// Google Gemini via its OpenAI-compatibility surface
    Gemini,
    /// DeepSeek (OpenAI-compatible)
    Deepseek,
    /// Any other OpenAI-compatible endpoint
    Custom,
}

impl Provider {
    /// All known providers, in preset display order
    pub const ALL: [Self; 4] = [Self::Openai, Self::Gemini, Self::Deepseek, Self::Custom];

    /// Lowercase wire name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Openai => "openai",
            Self::Gemini => "gemini",
            Self::Deepseek => "deepseek",
            Self::Custom => "custom",
        }
    }

    /// Default base URL and model list for this provider
    pub fn preset(self) -> ProviderPreset {
        match self {
            Self::Openai => ProviderPreset {
                label: "OpenAI",
                base_url: "https://api.openai.com/v1",
                models: &["gpt-4o-mini", "gpt-4o", "gpt-4.1-mini", "gpt-4.1", "gpt-4.1-nano", "o3-mini", "o4-mini"],
            },
            Self::Gemini => ProviderPreset {
                label: "Gemini (OpenAI-compatible)",
                base_url: "https://generativelanguage.googleapis.com/v1beta/openai/",
                models: &[
                    "gemini-3-pro-preview",
                    "gemini-3-flash-preview",
                    "gemini-2.5-pro",
                    "gemini-2.5-flash",
                    "gemini-2.5-flash-lite",
                ],
            },
            Self::Deepseek => ProviderPreset {
                label: "DeepSeek (OpenAI-compatible)",
                base_url: "https://api.deepseek.com/v1",
                models: &["deepseek-chat", "deepseek-reasoner"],
            },
            Self::Custom => ProviderPreset {
                label: "Custom (OpenAI-compatible)",
                base_url: "http://localhost:11434/v1",
                models: &[],
            },
        }
    }

    /// Guess the provider from a model name prefix
    ///
    /// Best-effort only: unrecognized prefixes fall back to OpenAI as
    /// the soft default, and `None` is returned only when no model was
    /// supplied at all.
    pub fn infer_from_model(model: Option<&str>) -> Option<Self> {
        let model = model?.trim();
        if model.is_empty() {
            return None;
        }
        let lower = model.to_ascii_lowercase();
        if lower.starts_with("gemini-") || lower.starts_with("google/") {
            return Some(Self::Gemini);
        }
        if lower.starts_with("deepseek-") || lower.starts_with("deepseek/") {
            return Some(Self::Deepseek);
        }
        Some(Self::Openai)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::Openai),
            "gemini" => Ok(Self::Gemini),
            "deepseek" => Ok(Self::Deepseek),
            "custom" => Ok(Self::Custom),
            _ => Err(UnknownProvider),
        }
    }
}

/// Error returned when a string names no known provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownProvider;

impl fmt::Display for UnknownProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown provider")
    }
}

impl std::error::Error for UnknownProvider {}

/// Static preset record for a provider
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProviderPreset {
    /// Human-readable label
    pub label: &'static str,
    /// Default base URL
    #[serde(rename = "baseUrl")]
    pub base_url: &'static str,
    /// Default model list (empty = unrestricted)
    pub models: &'static [&'static str],
}
