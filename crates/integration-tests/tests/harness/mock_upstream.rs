//! Mock upstream provider for integration tests
//!
//! Records every request it receives (path, auth and relay headers)
//! and answers from an optional scripted status sequence, so tests can
//! drive failover behavior deterministically.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use tokio_util::sync::CancellationToken;

/// Mock upstream that captures requests and plays back scripted statuses
pub struct MockUpstream {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

struct MockState {
    hits: AtomicU32,
    /// Statuses to answer with, in order; empty = 200
    statuses: Mutex<VecDeque<u16>>,
    /// Path-and-query of every request received
    paths: Mutex<Vec<String>>,
    /// `Authorization` header of every request (empty string if absent)
    auth_headers: Mutex<Vec<String>>,
    /// `x-relay-key` header of every request (empty string if absent)
    relay_headers: Mutex<Vec<String>>,
    /// When set, successful responses carry this body as an SSE stream
    sse_body: Option<String>,
}

impl MockUpstream {
    /// Start a mock that always answers 200
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_inner(Vec::new(), None).await
    }

    /// Start a mock that answers the given statuses in order, then 200
    pub async fn start_with_statuses(statuses: Vec<u16>) -> anyhow::Result<Self> {
        Self::start_inner(statuses, None).await
    }

    /// Start a mock whose successes stream the given SSE body
    pub async fn start_sse(body: &str) -> anyhow::Result<Self> {
        Self::start_inner(Vec::new(), Some(body.to_owned())).await
    }

    async fn start_inner(statuses: Vec<u16>, sse_body: Option<String>) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            hits: AtomicU32::new(0),
            statuses: Mutex::new(statuses.into()),
            paths: Mutex::new(Vec::new()),
            auth_headers: Mutex::new(Vec::new()),
            relay_headers: Mutex::new(Vec::new()),
            sse_body,
        });

        let app = Router::new().fallback(handle).with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL without any path, for keys whose callers send `/v1/...`
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Base URL with a custom suffix, e.g. a gemini-style prefix
    pub fn base_url_with(&self, suffix: &str) -> String {
        format!("http://{}{suffix}", self.addr)
    }

    /// Number of requests received
    pub fn hits(&self) -> u32 {
        self.state.hits.load(Ordering::Relaxed)
    }

    /// Path-and-query of every request, in arrival order
    pub fn paths(&self) -> Vec<String> {
        self.state.paths.lock().expect("paths lock").clone()
    }

    /// `Authorization` header values seen
    pub fn auth_headers(&self) -> Vec<String> {
        self.state.auth_headers.lock().expect("auth lock").clone()
    }

    /// `x-relay-key` header values seen
    pub fn relay_headers(&self) -> Vec<String> {
        self.state.relay_headers.lock().expect("relay lock").clone()
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle(State(state): State<Arc<MockState>>, request: Request) -> Response {
    state.hits.fetch_add(1, Ordering::Relaxed);

    let path_and_query = request
        .uri()
        .path_and_query()
        .map_or_else(|| request.uri().path().to_owned(), |pq| pq.as_str().to_owned());
    state.paths.lock().expect("paths lock").push(path_and_query);

    let header_str = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_owned()
    };
    state.auth_headers.lock().expect("auth lock").push(header_str("authorization"));
    state.relay_headers.lock().expect("relay lock").push(header_str("x-relay-key"));

    let scripted = state.statuses.lock().expect("statuses lock").pop_front();
    if let Some(code) = scripted {
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if !status.is_success() {
            return (
                status,
                Json(serde_json::json!({
                    "error": { "message": "scripted mock failure", "type": "mock_error" }
                })),
            )
                .into_response();
        }
    }

    if let Some(ref body) = state.sse_body {
        return (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/event-stream")],
            body.clone(),
        )
            .into_response();
    }

    Json(serde_json::json!({
        "id": "chatcmpl-mock-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": "hello from mock" },
            "finish_reason": "stop"
        }]
    }))
    .into_response()
}
