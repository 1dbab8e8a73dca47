//! Sliding time-bucketed series
//!
//! One point per 60-second bucket, retained across a trailing
//! 60-minute window. Reads reconstruct a dense, zero-filled series so
//! consumers never have to interpolate gaps.

use std::collections::BTreeMap;

use serde::Serialize;

/// Bucket width in milliseconds
pub const SERIES_BUCKET_MS: i64 = 60_000;

/// Number of one-minute buckets retained
pub const SERIES_WINDOW_MINUTES: i64 = 60;

/// Raw per-bucket accumulator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeriesPoint {
    pub count: u64,
    pub success: u64,
    pub failure: u64,
    pub latency_ms_sum: u64,
    pub latency_count: u64,
}

/// One bucket of a dense series, as served to consumers
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimedPoint {
    /// Bucket start, epoch millis
    pub t: i64,
    pub count: u64,
    pub success: u64,
    pub failure: u64,
    pub avg_latency_ms: Option<u64>,
    pub latency_count: u64,
}

/// Dense series for one key across the trailing window
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeySeries {
    pub id: String,
    pub name: String,
    pub provider: String,
    pub points: Vec<TimedPoint>,
}

/// Start of the bucket containing `now_ms`
pub const fn bucket_start(now_ms: i64) -> i64 {
    now_ms.div_euclid(SERIES_BUCKET_MS) * SERIES_BUCKET_MS
}

/// Oldest bucket start inside the retained window ending at `bucket`
pub const fn window_start(bucket: i64) -> i64 {
    bucket - SERIES_WINDOW_MINUTES * SERIES_BUCKET_MS
}

/// Reconstruct the dense window from a sparse bucket map
///
/// The window runs from its start to the current bucket inclusive, so
/// a 60-minute window yields 61 points.
pub fn densify(raw: &BTreeMap<i64, SeriesPoint>, now_ms: i64) -> Vec<TimedPoint> {
    let end = bucket_start(now_ms);
    let start = window_start(end);

    (0..=SERIES_WINDOW_MINUTES)
        .map(|i| {
            let t = start + i * SERIES_BUCKET_MS;
            raw.get(&t).map_or(
                TimedPoint {
                    t,
                    count: 0,
                    success: 0,
                    failure: 0,
                    avg_latency_ms: None,
                    latency_count: 0,
                },
                |point| TimedPoint {
                    t,
                    count: point.count,
                    success: point.success,
                    failure: point.failure,
                    avg_latency_ms: (point.latency_count > 0)
                        .then(|| point.latency_ms_sum / point.latency_count),
                    latency_count: point.latency_count,
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_map_densifies_to_zero_points_over_the_window() {
        let raw = BTreeMap::new();
        let points = densify(&raw, 7_200_000);
        assert_eq!(points.len(), 61);
        assert!(points.iter().all(|p| p.count == 0 && p.avg_latency_ms.is_none()));
        // Consecutive one-minute buckets ending at the current one
        assert_eq!(points.last().unwrap().t, 7_200_000);
        assert_eq!(points[1].t - points[0].t, SERIES_BUCKET_MS);
    }

    #[test]
    fn sparse_buckets_land_in_the_right_slots() {
        let now = 100 * SERIES_BUCKET_MS + 1_234;
        let current = bucket_start(now);
        let mut raw = BTreeMap::new();
        raw.insert(
            current,
            SeriesPoint {
                count: 3,
                success: 2,
                failure: 1,
                latency_ms_sum: 900,
                latency_count: 3,
            },
        );
        raw.insert(
            current - 5 * SERIES_BUCKET_MS,
            SeriesPoint {
                count: 1,
                success: 1,
                failure: 0,
                latency_ms_sum: 40,
                latency_count: 1,
            },
        );

        let points = densify(&raw, now);
        assert_eq!(points.len(), 61);

        let last = points.last().unwrap();
        assert_eq!(last.count, 3);
        assert_eq!(last.avg_latency_ms, Some(300));

        let older = &points[points.len() - 6];
        assert_eq!(older.count, 1);
        assert_eq!(older.avg_latency_ms, Some(40));

        assert_eq!(points.iter().map(|p| p.count).sum::<u64>(), 4);
    }

    #[test]
    fn bucket_start_floors_toward_minus_infinity() {
        assert_eq!(bucket_start(59_999), 0);
        assert_eq!(bucket_start(60_000), 60_000);
        assert_eq!(bucket_start(61_000), 60_000);
    }
}
