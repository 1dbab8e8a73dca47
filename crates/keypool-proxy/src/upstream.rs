//! Outbound dispatch to provider endpoints
//!
//! Builds the upstream request from the inbound one: path rewriting
//! for providers that need it, header filtering, credential injection,
//! and optional relay indirection.

use std::borrow::Cow;

use anyhow::Context;
use bytes::Bytes;
use http::header::{ACCEPT_ENCODING, AUTHORIZATION, CONTENT_LENGTH, HOST};
use http::{HeaderMap, HeaderName, Method};
use keypool_config::RelayConfig;
use keypool_core::Provider;
use keypool_state::KeyRecord;

/// Active relay indirection, resolved from config at startup
#[derive(Debug, Clone)]
struct RelayTarget {
    base_url: String,
    header: HeaderName,
}

/// HTTP client for upstream provider calls
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    relay: Option<RelayTarget>,
}

impl UpstreamClient {
    /// Build the client, resolving the relay target if one is enabled
    pub fn new(relay: Option<&RelayConfig>) -> anyhow::Result<Self> {
        let relay = relay
            .filter(|r| r.enabled)
            .map(|r| {
                let header = HeaderName::try_from(r.header.as_str())
                    .with_context(|| format!("invalid relay header name `{}`", r.header))?;
                Ok::<_, anyhow::Error>(RelayTarget {
                    base_url: r.base_url.as_str().to_owned(),
                    header,
                })
            })
            .transpose()?;

        let client = reqwest::Client::builder()
            .build()
            .context("failed to build upstream http client")?;

        Ok(Self { client, relay })
    }

    /// Dispatch one attempt with the given key
    ///
    /// The inbound body is forwarded verbatim except on GET/HEAD. The
    /// `Authorization` header is always ours, never the caller's. Keys
    /// flagged for relaying go to the relay base URL with the secret
    /// duplicated under the relay header.
    pub async fn dispatch(
        &self,
        key: &KeyRecord,
        method: &Method,
        path_and_query: &str,
        inbound_headers: &HeaderMap,
        body: Bytes,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let rewritten = rewrite_path(key.provider, path_and_query);
        let relaying = self.relay.as_ref().filter(|_| key.relay);
        let base = relaying.map_or(key.base_url.as_str(), |r| r.base_url.as_str());
        let url = join_url(base, &rewritten);

        let mut request = self
            .client
            .request(method.clone(), url)
            .headers(forward_headers(inbound_headers))
            .bearer_auth(&key.secret);

        if let Some(relay) = relaying {
            request = request.header(relay.header.clone(), key.secret.as_str());
        }

        if !matches!(*method, Method::GET | Method::HEAD) {
            request = request.body(body);
        }

        request.send().await
    }
}

/// Provider-specific path adjustment
///
/// Gemini's OpenAI-compatible surface lives directly under the base
/// URL, so the conventional leading `/v1` segment is stripped. Other
/// providers take the inbound path untouched.
pub fn rewrite_path(provider: Provider, path_and_query: &str) -> Cow<'_, str> {
    if provider != Provider::Gemini {
        return Cow::Borrowed(path_and_query);
    }
    match path_and_query.strip_prefix("/v1") {
        Some("") => Cow::Borrowed("/"),
        Some(rest) if rest.starts_with('/') => Cow::Borrowed(rest),
        Some(rest) if rest.starts_with('?') => Cow::Owned(format!("/{rest}")),
        // `/v1beta/...` and friends are not the `/v1` segment
        _ => Cow::Borrowed(path_and_query),
    }
}

/// Join a base URL and a request path without doubled slashes
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_owned()
    } else {
        format!("{base}/{path}")
    }
}

/// Copy inbound headers, dropping the ones we own
///
/// `Host` and `Content-Length` are recomputed for the upstream
/// connection; `Authorization` is replaced with the pool key's.
/// `Accept-Encoding` is dropped too: this client performs no
/// decompression, so an encoded upstream body would reach the caller
/// as raw compressed bytes.
pub fn forward_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in inbound {
        if name == HOST || name == CONTENT_LENGTH || name == AUTHORIZATION || name == ACCEPT_ENCODING {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}
