use axum::Json;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use secrecy::{ExposeSecret, SecretString};

/// Header carrying the admin shared secret
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Gate the admin surface behind a shared token
///
/// When no token is configured the surface is open; this matches
/// local single-operator deployments where the listener itself is the
/// boundary.
pub async fn admin_auth_middleware(expected: Option<SecretString>, request: Request, next: Next) -> Response {
    let Some(expected) = expected else {
        return next.run(request).await;
    };

    let presented = request
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if presented == expected.expose_secret() {
        next.run(request).await
    } else {
        (StatusCode::UNAUTHORIZED, Json(serde_json::json!({ "error": "unauthorized" }))).into_response()
    }
}
