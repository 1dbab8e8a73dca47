//! Admin surface: key CRUD, presets, stats, and time series
//!
//! All durable mutations go through the store's serialized update
//! path. Secrets never appear in responses; reads carry a masked
//! rendering instead.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use keypool_core::{Provider, mask_secret};
use keypool_state::{KeyRecord, KeyStore};
use keypool_usage::series::{SERIES_BUCKET_MS, SERIES_WINDOW_MINUTES, bucket_start};
use keypool_usage::{StatusClassCounts, UsageRecorder};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use url::Url;
use uuid::Uuid;

use crate::error::AdminError;

/// Shared state for the admin routes
#[derive(Clone)]
pub struct AdminState {
    pub store: Arc<KeyStore>,
    pub usage: Arc<UsageRecorder>,
}

/// Router for the admin surface (auth layer applied by the caller)
pub fn admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/presets", get(list_presets))
        .route("/admin/keys", get(list_keys).post(create_key))
        .route("/admin/keys/{id}", axum::routing::put(update_key).delete(delete_key))
        .route("/admin/stats", get(stats))
        .route("/admin/timeseries", get(timeseries))
        .with_state(state)
}

/// Key as rendered to admin readers: full record, masked secret
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MaskedKey {
    id: String,
    name: String,
    provider: Provider,
    api_key_masked: String,
    base_url: String,
    models: Vec<String>,
    enabled: bool,
    failures: u32,
    cooldown_until: i64,
    relay: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    weight: Option<f64>,
    created_at: String,
    updated_at: String,
}

impl From<KeyRecord> for MaskedKey {
    fn from(key: KeyRecord) -> Self {
        Self {
            id: key.id,
            name: key.name,
            provider: key.provider,
            api_key_masked: mask_secret(&key.secret),
            base_url: key.base_url,
            models: key.models,
            enabled: key.enabled,
            failures: key.failures,
            cooldown_until: key.cooldown_until,
            relay: key.relay,
            weight: key.weight,
            created_at: key.created_at,
            updated_at: key.updated_at,
        }
    }
}

/// Inbound create/update body; unknown fields are ignored
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyPayload {
    name: Option<String>,
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    models: Option<Vec<String>>,
    enabled: Option<bool>,
    relay: Option<bool>,
    weight: Option<f64>,
}

async fn list_presets() -> Result<Json<Value>, AdminError> {
    let mut presets = serde_json::Map::new();
    for provider in Provider::ALL {
        let value = serde_json::to_value(provider.preset()).map_err(keypool_state::StateError::Encode)?;
        presets.insert(provider.as_str().to_owned(), value);
    }
    Ok(Json(json!({ "presets": presets })))
}

async fn list_keys(State(state): State<AdminState>) -> Result<Json<Value>, AdminError> {
    let snapshot = state.store.load().await?;
    let keys: Vec<MaskedKey> = snapshot.keys.into_iter().map(MaskedKey::from).collect();
    Ok(Json(json!({ "keys": keys })))
}

async fn create_key(
    State(state): State<AdminState>,
    Json(payload): Json<KeyPayload>,
) -> Result<Json<Value>, AdminError> {
    let provider: Provider = payload
        .provider
        .as_deref()
        .unwrap_or("")
        .parse()
        .map_err(|_| AdminError::InvalidProvider)?;
    let secret = payload
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(AdminError::MissingSecret)?
        .to_owned();
    let base_url = payload
        .base_url
        .as_deref()
        .and_then(validate_base_url)
        .ok_or(AdminError::InvalidBaseUrl)?;

    let id = Uuid::new_v4().to_string();
    let now = jiff::Timestamp::now().to_string();
    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map_or_else(|| format!("{provider}-{}", &id[..6]), str::to_owned);

    let record = KeyRecord {
        id: id.clone(),
        name,
        provider,
        secret,
        base_url,
        models: trim_models(payload.models.unwrap_or_default()),
        enabled: payload.enabled.unwrap_or(true),
        failures: 0,
        cooldown_until: 0,
        relay: payload.relay.unwrap_or(false),
        weight: payload.weight,
        created_at: now.clone(),
        updated_at: now,
    };

    state.store.update(|snapshot| snapshot.keys.push(record)).await?;
    tracing::info!(key_id = %id, "admin created key");
    Ok(Json(json!({ "id": id })))
}

async fn update_key(
    State(state): State<AdminState>,
    Path(id): Path<String>,
    Json(payload): Json<KeyPayload>,
) -> Result<Json<Value>, AdminError> {
    // Validate before touching the snapshot so a bad field leaves the
    // key untouched
    let provider = payload
        .provider
        .as_deref()
        .map(|raw| raw.parse::<Provider>().map_err(|_| AdminError::InvalidProvider))
        .transpose()?;
    let base_url = payload
        .base_url
        .as_deref()
        .map(|raw| validate_base_url(raw).ok_or(AdminError::InvalidBaseUrl))
        .transpose()?;
    let secret = payload
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned);
    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_owned);
    let models = payload.models.map(trim_models);
    let now = jiff::Timestamp::now().to_string();

    let found = state
        .store
        .update(move |snapshot| {
            let Some(key) = snapshot.key_mut(&id) else {
                return false;
            };
            if let Some(name) = name {
                key.name = name;
            }
            if let Some(provider) = provider {
                key.provider = provider;
            }
            if let Some(base_url) = base_url {
                key.base_url = base_url;
            }
            if let Some(secret) = secret {
                key.secret = secret;
            }
            if let Some(models) = models {
                key.models = models;
            }
            if let Some(enabled) = payload.enabled {
                key.enabled = enabled;
            }
            if let Some(relay) = payload.relay {
                key.relay = relay;
            }
            if let Some(weight) = payload.weight {
                key.weight = Some(weight);
            }
            key.updated_at = now;
            true
        })
        .await?;

    if !found {
        return Err(AdminError::NotFound);
    }
    Ok(Json(json!({ "ok": true })))
}

async fn delete_key(State(state): State<AdminState>, Path(id): Path<String>) -> Result<Json<Value>, AdminError> {
    let removed = state
        .store
        .update(move |snapshot| {
            let before = snapshot.keys.len();
            snapshot.keys.retain(|k| k.id != id);
            snapshot.keys.len() != before
        })
        .await?;

    if !removed {
        return Err(AdminError::NotFound);
    }
    Ok(Json(json!({ "ok": true })))
}

/// One row of the stats listing
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatRow {
    id: String,
    name: String,
    provider: String,
    enabled: bool,
    failures: u32,
    cooldown_until: i64,
    total: u64,
    success: u64,
    failure: u64,
    status_class_counts: StatusClassCounts,
    avg_latency_ms: Option<u64>,
    last_at: i64,
    last_status: String,
}

async fn stats(State(state): State<AdminState>) -> Result<Json<Value>, AdminError> {
    let snapshot = state.store.load().await?;

    let mut rows: Vec<StatRow> = Vec::with_capacity(snapshot.keys.len());
    let mut index: HashMap<String, usize> = HashMap::new();
    for key in &snapshot.keys {
        index.insert(key.id.clone(), rows.len());
        rows.push(StatRow {
            id: key.id.clone(),
            name: key.name.clone(),
            provider: key.provider.to_string(),
            enabled: key.enabled,
            failures: key.failures,
            cooldown_until: key.cooldown_until,
            total: 0,
            success: 0,
            failure: 0,
            status_class_counts: StatusClassCounts::default(),
            avg_latency_ms: None,
            last_at: 0,
            last_status: String::new(),
        });
    }

    // Usage outlives key CRUD: entries for deleted keys become orphan
    // rows rather than disappearing
    for entry in state.usage.entries() {
        let i = *index.entry(entry.key_id.clone()).or_insert_with(|| {
            rows.push(StatRow {
                id: entry.key_id.clone(),
                name: if entry.key_name.is_empty() {
                    entry.key_id.clone()
                } else {
                    entry.key_name.clone()
                },
                provider: entry.provider.clone(),
                enabled: false,
                failures: 0,
                cooldown_until: 0,
                total: 0,
                success: 0,
                failure: 0,
                status_class_counts: StatusClassCounts::default(),
                avg_latency_ms: None,
                last_at: 0,
                last_status: String::new(),
            });
            rows.len() - 1
        });
        let row = &mut rows[i];
        row.total = entry.total;
        row.success = entry.success;
        row.failure = entry.failure;
        row.status_class_counts = entry.status_class_counts;
        row.avg_latency_ms = entry.avg_latency_ms();
        row.last_at = entry.last_at;
        row.last_status = entry.last_status;
    }

    rows.sort_by(|a, b| b.total.cmp(&a.total));
    Ok(Json(json!({ "items": rows })))
}

#[derive(Debug, Deserialize)]
struct TimeseriesQuery {
    #[serde(default)]
    ids: Option<String>,
}

async fn timeseries(
    State(state): State<AdminState>,
    Query(query): Query<TimeseriesQuery>,
) -> Result<Json<Value>, AdminError> {
    let snapshot = state.store.load().await?;
    let now = now_ms();

    let requested: Vec<String> = query
        .ids
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect();
    let ids: Vec<String> = if requested.is_empty() {
        snapshot.keys.iter().map(|k| k.id.clone()).collect()
    } else {
        requested
    };

    let mut series = state.usage.series_for(&ids, now);
    // The snapshot is authoritative for naming where the key still
    // exists
    for entry in &mut series {
        if let Some(key) = snapshot.key(&entry.id) {
            entry.name.clone_from(&key.name);
            entry.provider = key.provider.to_string();
        }
    }

    Ok(Json(json!({
        "bucketMs": SERIES_BUCKET_MS,
        "windowMinutes": SERIES_WINDOW_MINUTES,
        "endAt": bucket_start(now),
        "series": series,
    })))
}

/// Parse and normalize a base URL; absolute http/https only, one
/// trailing slash stripped
fn validate_base_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    let mut rendered = url.to_string();
    if rendered.ends_with('/') {
        rendered.pop();
    }
    Some(rendered)
}

fn trim_models(models: Vec<String>) -> Vec<String> {
    models
        .into_iter()
        .map(|m| m.trim().to_owned())
        .filter(|m| !m.is_empty())
        .collect()
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
    fn base_url_accepts_http_and_https() {
        assert_eq!(
            validate_base_url("https://api.openai.com/v1"),
            Some("https://api.openai.com/v1".to_owned())
        );
        assert_eq!(
            validate_base_url(" http://localhost:11434/v1/ "),
            Some("http://localhost:11434/v1".to_owned())
        );
    }

    #[test]
    fn base_url_rejects_other_schemes_and_garbage() {
        assert_eq!(validate_base_url("ftp://example.test"), None);
        assert_eq!(validate_base_url("file:///etc/passwd"), None);
        assert_eq!(validate_base_url("not a url"), None);
        assert_eq!(validate_base_url(""), None);
    }

    #[test]
    fn model_lists_are_trimmed_and_filtered() {
        let models = trim_models(vec![" gpt-4o ".to_owned(), String::new(), "  ".to_owned(), "o3-mini".to_owned()]);
        assert_eq!(models, vec!["gpt-4o", "o3-mini"]);
    }
}
