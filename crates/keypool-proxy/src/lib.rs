//! Request proxying for keypool
//!
//! Routes inbound OpenAI-compatible requests through the key pool:
//! selection, upstream dispatch with streaming passthrough, failure
//! classification, and retry-or-return orchestration.

#![allow(clippy::must_use_candidate)]

pub mod body;
mod error;
mod orchestrator;
pub mod upstream;

pub use body::InboundBody;
pub use error::ProxyError;
pub use orchestrator::{ProxyState, proxy_router};
pub use upstream::UpstreamClient;
