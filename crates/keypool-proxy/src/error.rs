use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use keypool_core::{HttpError, Provider};
use keypool_state::StateError;
use thiserror::Error;

/// Errors surfaced to proxy callers
#[derive(Debug, Error)]
pub enum ProxyError {
    /// No key passed the eligibility filter
    #[error("no key available")]
    NoKeyAvailable {
        provider: Option<Provider>,
        model: Option<String>,
    },

    /// Every attempt failed without a forwardable response
    #[error("upstream failed")]
    UpstreamFailed {
        provider: Option<Provider>,
        model: Option<String>,
    },

    /// Inbound body exceeded the configured ceiling
    #[error("request body too large")]
    BodyTooLarge,

    /// Inbound body could not be read, e.g. the caller disconnected
    #[error("failed to read request body")]
    BodyRead,

    /// Pool state could not be read or written
    #[error(transparent)]
    State(#[from] StateError),
}

impl HttpError for ProxyError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NoKeyAvailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::UpstreamFailed { .. } => StatusCode::BAD_GATEWAY,
            Self::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::BodyRead => StatusCode::BAD_REQUEST,
            Self::State(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Self::NoKeyAvailable { .. } => "no_available_apikey",
            Self::UpstreamFailed { .. } => "upstream_failed",
            Self::BodyTooLarge => "body_too_large",
            Self::BodyRead => "body_read_failed",
            Self::State(_) => "state_unavailable",
        }
    }

    fn client_message(&self) -> String {
        self.to_string()
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (provider, model) = match &self {
            Self::NoKeyAvailable { provider, model } | Self::UpstreamFailed { provider, model } => {
                (*provider, model.clone())
            }
            Self::BodyTooLarge | Self::BodyRead | Self::State(_) => (None, None),
        };

        let body = serde_json::json!({
            "error": self.error_code(),
            "provider": provider.map(|p| p.as_str()),
            "model": model,
        });
        (self.status_code(), Json(body)).into_response()
    }
}
