use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use keypool_core::HttpError;
use keypool_state::StateError;
use thiserror::Error;

/// Errors surfaced by the admin surface
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("unknown or missing provider")]
    InvalidProvider,

    #[error("api key is required")]
    MissingSecret,

    #[error("base url must be absolute http or https")]
    InvalidBaseUrl,

    #[error("no such key")]
    NotFound,

    #[error(transparent)]
    State(#[from] StateError),
}

impl HttpError for AdminError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidProvider | Self::MissingSecret | Self::InvalidBaseUrl => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::State(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Self::InvalidProvider => "provider_invalid",
            Self::MissingSecret => "apiKey_required",
            Self::InvalidBaseUrl => "baseUrl_invalid",
            Self::NotFound => "not_found",
            Self::State(_) => "state_unavailable",
        }
    }

    fn client_message(&self) -> String {
        self.to_string()
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.error_code() });
        (self.status_code(), Json(body)).into_response()
    }
}
