//! Checkpoint manager: persists the highest fully-applied block height.
//!
//! The height is written only after every event of a block (or catch-up
//! range) has been applied, so a crash replays at most the unfinished unit.
//! Replays are safe because ledger writes are idempotent.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use crate::error::SyncError;

/// A durable string-keyed medium that survives process restarts.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, SyncError>;

    /// Upsert `value` under `key`. Must be durable when it returns.
    async fn set(&self, key: &str, value: &str) -> Result<(), SyncError>;
}

/// Reads and writes the processed height under a single key.
#[derive(Clone)]
pub struct CheckpointManager {
    store: Arc<dyn CheckpointStore>,
    key: String,
    /// Height returned when nothing has been saved yet.
    start_height: u64,
}

impl CheckpointManager {
    pub fn new(store: Arc<dyn CheckpointStore>, key: impl Into<String>, start_height: u64) -> Self {
        Self {
            store,
            key: key.into(),
            start_height,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn start_height(&self) -> u64 {
        self.start_height
    }

    /// Load the saved height (`None` if none exists).
    pub async fn load(&self) -> Result<Option<u64>, SyncError> {
        match self.store.get(&self.key).await? {
            Some(raw) => raw.trim().parse::<u64>().map(Some).map_err(|e| {
                SyncError::Storage(format!("checkpoint '{}' holds '{raw}': {e}", self.key))
            }),
            None => Ok(None),
        }
    }

    /// The saved height, or the configured start height.
    pub async fn get(&self) -> Result<u64, SyncError> {
        Ok(self.load().await?.unwrap_or(self.start_height))
    }

    /// Persist `height`. The caller only ever moves it forward.
    pub async fn set(&self, height: u64) -> Result<(), SyncError> {
        self.store.set(&self.key, &height.to_string()).await?;
        debug!(key = %self.key, height, "checkpoint saved");
        Ok(())
    }
}

// ─── In-memory store (for testing) ────────────────────────────────────────────

/// In-memory checkpoint store for tests and dry runs.
#[derive(Default)]
pub struct MemoryCheckpointStore {
    data: Mutex<HashMap<String, String>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn get(&self, key: &str) -> Result<Option<String>, SyncError> {
        let data = self
            .data
            .lock()
            .map_err(|_| SyncError::Storage("checkpoint lock poisoned".into()))?;
        Ok(data.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), SyncError> {
        let mut data = self
            .data
            .lock()
            .map_err(|_| SyncError::Storage("checkpoint lock poisoned".into()))?;
        data.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
