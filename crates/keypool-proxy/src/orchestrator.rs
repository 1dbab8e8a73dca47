//! Failover orchestration
//!
//! One inbound request becomes up to `min(key_count, max_attempts)`
//! upstream attempts. The first response in [200, 400) streams back to
//! the caller; cooldown-worthy failures rotate to the next key; other
//! client errors are forwarded verbatim on the spot.

use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use axum::Router;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use futures_util::TryStreamExt;
use http::header::{CONTENT_ENCODING, CONTENT_TYPE, TRANSFER_ENCODING};
use keypool_core::Provider;
use keypool_state::select::pick_round_robin;
use keypool_state::{KeyStore, SelectionFilter, health};
use keypool_usage::{Observation, UsageRecorder};

use crate::body::InboundBody;
use crate::error::ProxyError;
use crate::upstream::UpstreamClient;

/// Header callers use to pin a request to one provider
pub const PROVIDER_HEADER: &str = "x-llm-provider";

/// Shared state for the proxy routes
#[derive(Clone)]
pub struct ProxyState {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<KeyStore>,
    usage: Arc<UsageRecorder>,
    upstream: UpstreamClient,
    max_attempts: usize,
    body_limit: usize,
}

impl ProxyState {
    pub fn new(
        store: Arc<KeyStore>,
        usage: Arc<UsageRecorder>,
        upstream: UpstreamClient,
        max_attempts: usize,
        body_limit: usize,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                usage,
                upstream,
                max_attempts,
                body_limit,
            }),
        }
    }
}

/// Router for the OpenAI-compatible proxy surface
pub fn proxy_router(state: ProxyState) -> Router {
    Router::new()
        .route("/v1", any(proxy_handler))
        .route("/v1/{*rest}", any(proxy_handler))
        .route("/chat/{*rest}", any(proxy_handler))
        .route("/embeddings", any(proxy_handler))
        .route("/models", any(proxy_handler))
        .with_state(state)
}

async fn proxy_handler(State(state): State<ProxyState>, request: Request) -> Response {
    match state.inner.handle(request).await {
        Ok(response) => response,
        Err(error) => error.into_response(),
    }
}

impl Inner {
    async fn handle(&self, request: Request) -> Result<Response, ProxyError> {
        let (parts, body) = request.into_parts();
        let method = parts.method;
        let path = parts.uri.path().to_owned();
        let path_and_query = parts
            .uri
            .path_and_query()
            .map_or_else(|| path.clone(), |pq| pq.as_str().to_owned());
        let headers = parts.headers;

        let bytes = axum::body::to_bytes(body, self.body_limit)
            .await
            .map_err(|e| classify_body_error(&e))?;

        let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
        let inbound = InboundBody::sniff(content_type, bytes);
        let model = inbound.model().map(str::to_owned);

        let provider_header = headers.get(PROVIDER_HEADER).and_then(|v| v.to_str().ok());
        let provider = resolve_provider(provider_header, model.as_deref());
        let filter = SelectionFilter {
            provider,
            model: model.clone(),
        };

        // The attempt budget is fixed from the pool size at entry;
        // concurrent CRUD does not grow it mid-request.
        let key_count = self.store.load().await?.keys.len();
        let attempts = key_count.min(self.max_attempts);
        if attempts == 0 {
            return Err(ProxyError::NoKeyAvailable { provider, model });
        }

        for attempt in 0..attempts {
            let picked = self
                .store
                .update(|snapshot| pick_round_robin(snapshot, &filter, now_ms()))
                .await?;
            let Some(key) = picked else {
                return Err(ProxyError::NoKeyAvailable { provider, model });
            };

            tracing::debug!(
                key = %key.name,
                provider = %key.provider,
                attempt,
                path = %path,
                "dispatching upstream attempt"
            );

            let in_flight = metrics::gauge!(
                "keypool_in_flight",
                "provider" => key.provider.as_str(),
                "key_id" => key.id.clone(),
                "key_name" => key.name.clone(),
            );
            in_flight.increment(1.0);
            let started = Instant::now();
            let result = self
                .upstream
                .dispatch(&key, &method, &path_and_query, &headers, inbound.bytes().clone())
                .await;
            let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            in_flight.decrement(1.0);

            let status = match &result {
                Ok(response) => Some(response.status().as_u16()),
                Err(_) => None,
            };
            self.observe(Observation {
                key_id: key.id.clone(),
                key_name: key.name.clone(),
                provider: key.provider,
                model: model.clone().unwrap_or_default(),
                path: path.clone(),
                method: method.to_string(),
                status,
                latency_ms,
            });

            match result {
                Err(error) => {
                    tracing::warn!(key = %key.name, attempt, %error, "upstream attempt failed");
                    self.mark_failure(&key.id, None).await;
                    // Transport failures always rotate while budget remains
                }
                Ok(response) => {
                    let code = response.status().as_u16();
                    if (200..400).contains(&code) {
                        self.mark_success(&key.id).await;
                        return Ok(forward_response(response));
                    }

                    tracing::warn!(key = %key.name, attempt, status = code, "upstream returned error status");
                    self.mark_failure(&key.id, Some(code)).await;

                    let rotate = attempt + 1 < attempts && health::should_cooldown(Some(code));
                    if !rotate {
                        // Request-shaped 4xx, or budget exhausted: the
                        // caller gets the upstream's answer verbatim
                        return Ok(forward_response(response));
                    }
                    // Drain so the connection can be reused
                    let _ = response.bytes().await;
                }
            }
        }

        Err(ProxyError::UpstreamFailed { provider, model })
    }

    fn observe(&self, observation: Observation) {
        metrics::counter!(
            "keypool_requests_total",
            "provider" => observation.provider.as_str(),
            "key_id" => observation.key_id.clone(),
            "key_name" => observation.key_name.clone(),
            "model" => observation.model.clone(),
            "path" => observation.path.clone(),
            "method" => observation.method.clone(),
            "status" => observation.status_label(),
        )
        .increment(1);

        #[allow(clippy::cast_precision_loss)]
        let seconds = observation.latency_ms as f64 / 1_000.0;
        metrics::histogram!(
            "keypool_request_duration_seconds",
            "provider" => observation.provider.as_str(),
            "key_id" => observation.key_id.clone(),
            "key_name" => observation.key_name.clone(),
            "model" => observation.model.clone(),
            "path" => observation.path.clone(),
            "method" => observation.method.clone(),
        )
        .record(seconds);

        self.usage.record(&observation);
    }

    async fn mark_success(&self, key_id: &str) {
        let result = self
            .store
            .update(|snapshot| health::mark_success(snapshot, key_id))
            .await;
        if let Err(error) = result {
            tracing::error!(key_id, %error, "failed to persist key success");
        }
    }

    async fn mark_failure(&self, key_id: &str, status: Option<u16>) {
        let result = self
            .store
            .update(|snapshot| health::mark_failure(snapshot, key_id, status, now_ms()))
            .await;
        if let Err(error) = result {
            tracing::error!(key_id, %error, "failed to persist key failure");
        }
    }
}

/// Map a body-read failure to the caller-facing error
///
/// Only a tripped length limit is 413; anything else, such as the
/// caller disconnecting mid-read, is a plain bad request.
fn classify_body_error(error: &axum::Error) -> ProxyError {
    let mut cause: Option<&(dyn std::error::Error + 'static)> = Some(error);
    while let Some(current) = cause {
        if current.is::<http_body_util::LengthLimitError>() {
            return ProxyError::BodyTooLarge;
        }
        cause = current.source();
    }
    ProxyError::BodyRead
}

/// Resolve the provider constraint for a request
///
/// An explicit, recognized `x-llm-provider` header wins; otherwise the
/// provider is inferred from the model name. Unrecognized header
/// values fall through to inference rather than erroring.
fn resolve_provider(header: Option<&str>, model: Option<&str>) -> Option<Provider> {
    if let Some(raw) = header
        && let Ok(provider) = raw.trim().parse::<Provider>()
    {
        return Some(provider);
    }
    Provider::infer_from_model(model)
}

/// Convert an upstream response into the caller-facing one
///
/// The body streams through without buffering. Hop-encoding headers
/// are dropped: the body arrives here already decoded/deframed, and
/// our own server layer re-frames it.
fn forward_response(upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    let mut headers = http::HeaderMap::new();
    for (name, value) in upstream.headers() {
        if name == TRANSFER_ENCODING || name == CONTENT_ENCODING {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    let stream = upstream.bytes_stream().map_err(std::io::Error::other);
    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_provider_header_wins() {
        assert_eq!(resolve_provider(Some("gemini"), Some("gpt-4o")), Some(Provider::Gemini));
        assert_eq!(resolve_provider(Some(" deepseek "), None), Some(Provider::Deepseek));
    }

    #[test]
    fn unknown_header_falls_back_to_model_inference() {
        assert_eq!(
            resolve_provider(Some("not-a-provider"), Some("gemini-2.5-pro")),
            Some(Provider::Gemini)
        );
        assert_eq!(resolve_provider(Some("not-a-provider"), None), None);
    }

    #[test]
    fn no_hint_means_no_constraint() {
        assert_eq!(resolve_provider(None, None), None);
    }

    #[tokio::test]
    async fn oversized_body_classifies_as_too_large() {
        let body = Body::from(vec![0u8; 64]);
        let error = axum::body::to_bytes(body, 16).await.unwrap_err();
        assert!(matches!(classify_body_error(&error), ProxyError::BodyTooLarge));
    }

    #[tokio::test]
    async fn aborted_body_read_is_not_too_large() {
        let stream = futures_util::stream::once(async {
            Err::<bytes::Bytes, std::io::Error>(std::io::Error::other("connection reset"))
        });
        let body = Body::from_stream(stream);
        let error = axum::body::to_bytes(body, 1024).await.unwrap_err();
        assert!(matches!(classify_body_error(&error), ProxyError::BodyRead));
    }
}
