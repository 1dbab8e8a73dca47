//! HTTP server assembly for keypool
//!
//! Wires the proxy surface, the admin surface, liveness, and metrics
//! exposition into one router, and owns the listener lifecycle.

mod admin;
mod auth;
mod error;
mod health;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use keypool_config::Config;
use keypool_proxy::{ProxyState, UpstreamClient, proxy_router};
use keypool_state::KeyStore;
use keypool_usage::UsageRecorder;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::trace::TraceLayer;

pub use auth::ADMIN_TOKEN_HEADER;
pub use error::AdminError;

/// Assembled server with all routes and middleware
pub struct Server {
    router: Router,
    listen_address: SocketAddr,
}

impl Server {
    /// Build the server from configuration
    ///
    /// `metrics` is the render handle from telemetry init; pass `None`
    /// to skip the exposition route (metrics disabled, or embedded in
    /// tests where no global recorder is installed).
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream client cannot be built, e.g.
    /// an invalid relay header name.
    pub fn new(config: Config, metrics: Option<PrometheusHandle>) -> anyhow::Result<Self> {
        let listen_address = config
            .server
            .listen_address
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8787)));

        let store = Arc::new(KeyStore::new(config.pool.data_file.clone()));
        let usage = Arc::new(UsageRecorder::new());
        let upstream = UpstreamClient::new(config.relay.as_ref())?;
        let proxy_state = ProxyState::new(
            Arc::clone(&store),
            Arc::clone(&usage),
            upstream,
            config.pool.max_attempts,
            config.server.body_limit_bytes,
        );

        let mut app = Router::new();

        if config.server.health.enabled {
            app = app.route(&config.server.health.path, axum::routing::get(health::health_handler));
        }

        if let Some(handle) = metrics {
            app = app.route(
                &config.server.metrics_path,
                axum::routing::get(move || {
                    let handle = handle.clone();
                    async move { handle.render() }
                }),
            );
        }

        // Admin surface, gated by the shared token when one is set
        let admin_state = admin::AdminState {
            store: Arc::clone(&store),
            usage: Arc::clone(&usage),
        };
        let admin_token = config.server.admin_token.clone();
        let admin = admin::admin_router(admin_state).layer(axum::middleware::from_fn(move |req, next| {
            let expected = admin_token.clone();
            async move { auth::admin_auth_middleware(expected, req, next).await }
        }));
        app = app.merge(admin);

        // Proxy surface last; it carries the wildcard routes
        app = app.merge(proxy_router(proxy_state));

        app = app.layer(TraceLayer::new_for_http());

        Ok(Self {
            router: app,
            listen_address,
        })
    }

    /// Get the configured listen address
    #[must_use]
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Consume the server and return the inner router
    ///
    /// Useful for testing when the caller manages the listener
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Start serving requests
    ///
    /// Blocks until the cancellation token is triggered.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the TCP listener or serving fails
    pub async fn serve(self, shutdown: tokio_util::sync::CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await?;

        Ok(())
    }
}
