//! Durable key-pool state for keypool
//!
//! The pool snapshot (keys plus round-robin cursor) lives in a single
//! JSON file owned by [`KeyStore`]. Health transitions and selection
//! operate on a freshly loaded snapshot and persist their mutations
//! through the store's serialized `update` path, so concurrent
//! requests can never interleave partial read-modify-write cycles.

#![allow(clippy::must_use_candidate)]

mod error;
pub mod health;
pub mod select;
mod store;
mod types;

pub use error::StateError;
pub use select::SelectionFilter;
pub use store::KeyStore;
pub use types::{KeyRecord, PoolSnapshot, SNAPSHOT_VERSION};
