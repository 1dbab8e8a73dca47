//! Durable snapshot store with serialized mutations
//!
//! All read-modify-write cycles go through [`KeyStore::update`], which
//! holds an async mutex across load, mutation, and save. Writes go to
//! a uniquely named temp file followed by an atomic rename, so a crash
//! mid-write can never leave a truncated snapshot behind.

use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::StateError;
use crate::types::PoolSnapshot;

/// Owner of the durable pool snapshot
pub struct KeyStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl KeyStore {
    /// Create a store backed by the given snapshot file
    ///
    /// The file and its parent directory are created lazily on first
    /// access.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Snapshot file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the current snapshot
    ///
    /// A missing, unreadable, or structurally invalid file is replaced
    /// with the default empty snapshot, which is persisted before
    /// being returned. Corruption therefore never fails the caller.
    ///
    /// # Errors
    ///
    /// Returns an error only if persisting a replacement snapshot
    /// fails.
    pub async fn load(&self) -> Result<PoolSnapshot, StateError> {
        let _guard = self.lock.lock().await;
        self.read_or_heal().await
    }

    /// Apply a mutation to the snapshot and persist the result
    ///
    /// The mutex is held across load, mutation, and save, so updates
    /// from concurrent requests are applied one at a time and no
    /// rr-index increment or health transition can be lost.
    ///
    /// # Errors
    ///
    /// Returns an error if the mutated snapshot cannot be persisted.
    pub async fn update<R>(&self, mutate: impl FnOnce(&mut PoolSnapshot) -> R) -> Result<R, StateError> {
        let _guard = self.lock.lock().await;
        let mut snapshot = self.read_or_heal().await?;
        let out = mutate(&mut snapshot);
        self.persist(&snapshot).await?;
        Ok(out)
    }

    /// Read the snapshot, replacing it with the default on any failure
    async fn read_or_heal(&self) -> Result<PoolSnapshot, StateError> {
        match tokio::fs::read(&self.path).await {
            Ok(raw) => match serde_json::from_slice::<PoolSnapshot>(&raw) {
                Ok(snapshot) => return Ok(snapshot),
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        error = %e,
                        "pool snapshot invalid, replacing with empty pool"
                    );
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "pool snapshot unreadable, replacing with empty pool"
                );
            }
        }

        let fresh = PoolSnapshot::default();
        self.persist(&fresh).await?;
        Ok(fresh)
    }

    /// Write the full snapshot via write-then-atomic-rename
    async fn persist(&self, snapshot: &PoolSnapshot) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(format!(".{}.tmp", Uuid::new_v4()));
        let tmp = PathBuf::from(tmp);

        let encoded = serde_json::to_vec_pretty(snapshot)?;
        tokio::fs::write(&tmp, &encoded).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
