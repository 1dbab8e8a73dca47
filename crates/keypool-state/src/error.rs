use thiserror::Error;

/// Errors that can occur while persisting pool state
///
/// Reads never fail: a missing or corrupt snapshot is replaced with
/// the default empty pool. Only the write path can surface errors.
#[derive(Debug, Error)]
pub enum StateError {
    /// Filesystem failure while writing the snapshot
    #[error("failed to persist pool snapshot: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be serialized
    #[error("failed to encode pool snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}
