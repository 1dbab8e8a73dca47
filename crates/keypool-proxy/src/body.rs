//! Inbound request bodies
//!
//! Bodies are never interpreted beyond one opportunistic read: when
//! the content type is JSON, a top-level `model` string is extracted
//! for routing. Everything else is opaque bytes forwarded verbatim.

use bytes::Bytes;

/// Inbound body, tagged by how much structure was recognized
#[derive(Debug, Clone)]
pub enum InboundBody {
    /// JSON object; `model` holds the routing hint if one was present
    Json { bytes: Bytes, model: Option<String> },
    /// Anything else, forwarded untouched
    Opaque(Bytes),
}

impl InboundBody {
    /// Classify raw bytes using the inbound content type
    ///
    /// Unparseable JSON degrades to opaque bytes rather than failing:
    /// the upstream is the authority on body validity.
    pub fn sniff(content_type: Option<&str>, bytes: Bytes) -> Self {
        let is_json = content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"));
        if !is_json {
            return Self::Opaque(bytes);
        }

        match serde_json::from_slice::<serde_json::Value>(&bytes) {
            Ok(value) => {
                let model = value
                    .get("model")
                    .and_then(serde_json::Value::as_str)
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(str::to_owned);
                Self::Json { bytes, model }
            }
            Err(_) => Self::Opaque(bytes),
        }
    }

    /// Routing hint extracted from a JSON body
    pub fn model(&self) -> Option<&str> {
        match self {
            Self::Json { model, .. } => model.as_deref(),
            Self::Opaque(_) => None,
        }
    }

    /// Raw bytes to forward upstream
    pub fn bytes(&self) -> &Bytes {
        match self {
            Self::Json { bytes, .. } | Self::Opaque(bytes) => bytes,
        }
    }
}
