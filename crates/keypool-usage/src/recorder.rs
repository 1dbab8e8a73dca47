//! Lifetime usage counters and series recording

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use keypool_core::Provider;
use serde::Serialize;

use crate::series::{self, KeySeries, SeriesPoint};

/// Bucketing of an attempt outcome for aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Informational,
    Success,
    Redirect,
    ClientError,
    ServerError,
    /// No HTTP status was obtained (transport failure)
    Error,
}

impl StatusClass {
    /// Classify an optional HTTP status code
    pub const fn classify(status: Option<u16>) -> Self {
        match status {
            None => Self::Error,
            Some(code) => match code / 100 {
                1 => Self::Informational,
                2 => Self::Success,
                3 => Self::Redirect,
                4 => Self::ClientError,
                5 => Self::ServerError,
                _ => Self::Error,
            },
        }
    }

    /// Label used in metrics and admin responses
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Informational => "1xx",
            Self::Success => "2xx",
            Self::Redirect => "3xx",
            Self::ClientError => "4xx",
            Self::ServerError => "5xx",
            Self::Error => "error",
        }
    }
}

/// Histogram over status classes
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct StatusClassCounts {
    #[serde(rename = "2xx")]
    pub success: u64,
    #[serde(rename = "3xx")]
    pub redirect: u64,
    #[serde(rename = "4xx")]
    pub client_error: u64,
    #[serde(rename = "5xx")]
    pub server_error: u64,
    pub error: u64,
}

impl StatusClassCounts {
    fn bump(&mut self, class: StatusClass) {
        match class {
            // 1xx is not surfaced separately; fold it into error
            StatusClass::Informational | StatusClass::Error => self.error += 1,
            StatusClass::Success => self.success += 1,
            StatusClass::Redirect => self.redirect += 1,
            StatusClass::ClientError => self.client_error += 1,
            StatusClass::ServerError => self.server_error += 1,
        }
    }
}

/// One upstream attempt, as observed by the orchestrator
#[derive(Debug, Clone)]
pub struct Observation {
    pub key_id: String,
    pub key_name: String,
    pub provider: Provider,
    pub model: String,
    pub path: String,
    pub method: String,
    /// Upstream HTTP status; `None` when no response was obtained
    pub status: Option<u16>,
    pub latency_ms: u64,
}

impl Observation {
    /// Whether this attempt counts as a success (status in [200, 400))
    pub fn is_success(&self) -> bool {
        self.status.is_some_and(|code| (200..400).contains(&code))
    }

    /// Status label for metrics (`"error"` for transport failures)
    pub fn status_label(&self) -> String {
        self.status.map_or_else(|| "error".to_owned(), |code| code.to_string())
    }
}

/// Process-lifetime usage for one key
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UsageEntry {
    pub key_id: String,
    pub key_name: String,
    pub provider: String,
    pub total: u64,
    pub success: u64,
    pub failure: u64,
    pub status_class_counts: StatusClassCounts,
    pub latency_ms_sum: u64,
    pub latency_count: u64,
    /// Epoch millis of the most recent attempt
    pub last_at: i64,
    /// Status label of the most recent attempt
    pub last_status: String,
}

impl UsageEntry {
    fn new(key_id: &str) -> Self {
        Self {
            key_id: key_id.to_owned(),
            key_name: String::new(),
            provider: String::new(),
            total: 0,
            success: 0,
            failure: 0,
            status_class_counts: StatusClassCounts::default(),
            latency_ms_sum: 0,
            latency_count: 0,
            last_at: 0,
            last_status: String::new(),
        }
    }

    /// Mean latency over all recorded attempts
    pub const fn avg_latency_ms(&self) -> Option<u64> {
        if self.latency_count == 0 {
            None
        } else {
            Some(self.latency_ms_sum / self.latency_count)
        }
    }
}

/// In-memory recorder for per-key usage and time series
///
/// Increments are commutative, so lightweight per-entry locking via
/// the concurrent map is all the synchronization required.
#[derive(Default)]
pub struct UsageRecorder {
    usage: DashMap<String, UsageEntry>,
    series: DashMap<String, BTreeMap<i64, SeriesPoint>>,
}

impl UsageRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one attempt at the current wall-clock time
    pub fn record(&self, observation: &Observation) {
        self.record_at(now_ms(), observation);
    }

    /// Record one attempt at an explicit time (epoch millis)
    pub fn record_at(&self, now_ms: i64, observation: &Observation) {
        let success = observation.is_success();

        {
            let mut entry = self
                .usage
                .entry(observation.key_id.clone())
                .or_insert_with(|| UsageEntry::new(&observation.key_id));
            entry.key_name.clone_from(&observation.key_name);
            entry.provider = observation.provider.to_string();
            entry.total += 1;
            if success {
                entry.success += 1;
            } else {
                entry.failure += 1;
            }
            entry
                .status_class_counts
                .bump(StatusClass::classify(observation.status));
            entry.latency_ms_sum += observation.latency_ms;
            entry.latency_count += 1;
            entry.last_at = now_ms;
            entry.last_status = observation.status_label();
        }

        let bucket = series::bucket_start(now_ms);
        let window_start = series::window_start(bucket);
        let mut buckets = self.series.entry(observation.key_id.clone()).or_default();
        // Lazy eviction: drop anything older than the trailing window
        buckets.retain(|t, _| *t >= window_start);
        let point = buckets.entry(bucket).or_default();
        point.count += 1;
        if success {
            point.success += 1;
        } else {
            point.failure += 1;
        }
        point.latency_ms_sum += observation.latency_ms;
        point.latency_count += 1;
    }

    /// Lifetime usage for one key, if any was recorded
    pub fn entry(&self, key_id: &str) -> Option<UsageEntry> {
        self.usage.get(key_id).map(|e| e.clone())
    }

    /// Lifetime usage for every observed key, deleted keys included
    pub fn entries(&self) -> Vec<UsageEntry> {
        self.usage.iter().map(|e| e.clone()).collect()
    }

    /// Dense series for the given key ids across the trailing window
    ///
    /// Keys with no recorded traffic yield fully zero-filled series.
    /// `name`/`provider` are filled from usage where known; callers
    /// holding the snapshot overwrite them with authoritative values.
    pub fn series_for(&self, key_ids: &[String], now_ms: i64) -> Vec<KeySeries> {
        key_ids
            .iter()
            .map(|id| {
                let points = self
                    .series
                    .get(id)
                    .map_or_else(|| series::densify(&BTreeMap::new(), now_ms), |raw| series::densify(&raw, now_ms));
                let (name, provider) = self
                    .usage
                    .get(id)
                    .map_or_else(|| (id.clone(), String::new()), |e| (e.key_name.clone(), e.provider.clone()));
                KeySeries {
                    id: id.clone(),
                    name,
                    provider,
                    points,
                }
            })
            .collect()
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::SERIES_BUCKET_MS;

    fn observation(status: Option<u16>, latency_ms: u64) -> Observation {
        Observation {
            key_id: "k1".to_owned(),
            key_name: "primary".to_owned(),
            provider: Provider::Openai,
            model: "gpt-4o".to_owned(),
            path: "/v1/chat/completions".to_owned(),
            method: "POST".to_owned(),
            status,
            latency_ms,
        }
    }

    const NOW: i64 = 120 * SERIES_BUCKET_MS;

    #[test]
    fn lifetime_counters_accumulate() {
        let recorder = UsageRecorder::new();
        recorder.record_at(NOW, &observation(Some(200), 100));
        recorder.record_at(NOW, &observation(Some(302), 20));
        recorder.record_at(NOW, &observation(Some(404), 30));
        recorder.record_at(NOW, &observation(Some(500), 40));
        recorder.record_at(NOW, &observation(None, 50));

        let entry = recorder.entry("k1").unwrap();
        assert_eq!(entry.total, 5);
        assert_eq!(entry.success, 2); // 200 and 302 both land in [200,400)
        assert_eq!(entry.failure, 3);
        assert_eq!(entry.status_class_counts.success, 1);
        assert_eq!(entry.status_class_counts.redirect, 1);
        assert_eq!(entry.status_class_counts.client_error, 1);
        assert_eq!(entry.status_class_counts.server_error, 1);
        assert_eq!(entry.status_class_counts.error, 1);
        assert_eq!(entry.avg_latency_ms(), Some(48));
        assert_eq!(entry.last_status, "error");
        assert_eq!(entry.last_at, NOW);
    }

    #[test]
    fn unknown_key_has_no_entry() {
        let recorder = UsageRecorder::new();
        assert!(recorder.entry("ghost").is_none());
    }

    #[test]
    fn idle_key_gets_zero_filled_series() {
        let recorder = UsageRecorder::new();
        let series = recorder.series_for(&["quiet".to_owned()], NOW);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].points.len(), 61);
        assert!(series[0].points.iter().all(|p| p.count == 0));
    }

    #[test]
    fn buckets_older_than_window_are_evicted_on_write() {
        let recorder = UsageRecorder::new();
        recorder.record_at(NOW, &observation(Some(200), 10));

        // Two hours later the old bucket is outside the window
        let later = NOW + 120 * SERIES_BUCKET_MS;
        recorder.record_at(later, &observation(Some(200), 10));

        let series = recorder.series_for(&["k1".to_owned()], later);
        let total: u64 = series[0].points.iter().map(|p| p.count).sum();
        assert_eq!(total, 1);

        let raw = recorder.series.get("k1").unwrap();
        assert_eq!(raw.len(), 1);
    }

    #[test]
    fn orphaned_entries_stay_readable() {
        // No snapshot is involved: usage exists independently of key CRUD
        let recorder = UsageRecorder::new();
        recorder.record_at(NOW, &observation(Some(200), 10));
        assert_eq!(recorder.entries().len(), 1);
    }

    #[test]
    fn status_class_labels() {
        assert_eq!(StatusClass::classify(Some(204)).as_str(), "2xx");
        assert_eq!(StatusClass::classify(Some(301)).as_str(), "3xx");
        assert_eq!(StatusClass::classify(Some(429)).as_str(), "4xx");
        assert_eq!(StatusClass::classify(Some(502)).as_str(), "5xx");
        assert_eq!(StatusClass::classify(None).as_str(), "error");
    }

    #[test]
    fn status_counts_serialize_with_wire_names() {
        let counts = StatusClassCounts {
            success: 1,
            ..StatusClassCounts::default()
        };
        let json = serde_json::to_value(counts).unwrap();
        assert_eq!(json["2xx"], 1);
        assert_eq!(json["error"], 0);
    }
}
