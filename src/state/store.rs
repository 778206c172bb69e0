//! Checkpoint stores
//!
//! A checkpoint writes the full state map in one go. The file store writes
//! to a temp file first and renames it over the old state, so a crash
//! mid-write leaves the previous checkpoint intact.

use super::types::SyncState;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

/// Durable home of the sync state
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Read the persisted state; an empty state if nothing was saved yet
    async fn load(&self) -> Result<SyncState>;

    /// Persist the full state, all or nothing
    async fn checkpoint(&self, state: &SyncState) -> Result<()>;
}

/// JSON file checkpoint store
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    /// Create a store backed by `path`
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path to the state file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn load(&self) -> Result<SyncState> {
        if !self.path.exists() {
            return Ok(SyncState::new());
        }

        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::state(format!("Failed to read state file: {e}")))?;

        if contents.trim().is_empty() {
            return Ok(SyncState::new());
        }
        SyncState::from_json(&contents)
    }

    async fn checkpoint(&self, state: &SyncState) -> Result<()> {
        let contents = state.to_json_pretty()?;

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents)
            .await
            .map_err(|e| Error::checkpoint(format!("Failed to write state file: {e}")))?;

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| Error::checkpoint(format!("Failed to rename state file: {e}")))?;

        debug!("Checkpoint written to {}", self.path.display());
        Ok(())
    }
}

/// In-memory checkpoint store
///
/// Keeps every checkpoint written, which makes it useful for inspecting a
/// run after the fact.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    state: RwLock<SyncState>,
    history: RwLock<Vec<SyncState>>,
}

impl MemoryCheckpointStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `state`
    pub fn with_state(state: SyncState) -> Self {
        Self {
            state: RwLock::new(state),
            history: RwLock::new(Vec::new()),
        }
    }

    /// The last checkpointed state
    pub async fn snapshot(&self) -> SyncState {
        self.state.read().await.clone()
    }

    /// Every checkpoint written, oldest first
    pub async fn history(&self) -> Vec<SyncState> {
        self.history.read().await.clone()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self) -> Result<SyncState> {
        Ok(self.state.read().await.clone())
    }

    async fn checkpoint(&self, state: &SyncState) -> Result<()> {
        *self.state.write().await = state.clone();
        self.history.write().await.push(state.clone());
        Ok(())
    }
}
