//! In-memory usage aggregation for keypool
//!
//! Tracks per-key lifetime counters and a sliding one-minute-bucket
//! time series over a trailing hour. All state is volatile and local
//! to the running process; it is never part of the durable snapshot,
//! and entries for deleted keys stay readable until restart.

#![allow(clippy::must_use_candidate)]

mod recorder;
pub mod series;

pub use recorder::{Observation, StatusClass, StatusClassCounts, UsageEntry, UsageRecorder};
pub use series::{KeySeries, SERIES_BUCKET_MS, SERIES_WINDOW_MINUTES, SeriesPoint, TimedPoint};
