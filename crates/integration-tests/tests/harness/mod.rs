//! Shared test harness
//!
//! Each integration test binary pulls in the whole harness, so not
//! every item is used by every binary.
#![allow(dead_code)]

pub mod config;
pub mod mock_upstream;
pub mod server;
