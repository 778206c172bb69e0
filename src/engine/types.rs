//! Engine types

use crate::error::{Error, Result};
use crate::fetch::DEFAULT_PAGE_SIZES;
use serde::{Deserialize, Serialize};

/// Configuration for sync operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Page size of each parallel slot
    #[serde(default = "default_page_size")]
    pub page_size: u64,

    /// Descending page sizes tried when a page keeps failing
    #[serde(default = "default_page_sizes")]
    pub page_sizes: Vec<u64>,

    /// Concurrent page requests per round
    #[serde(default = "default_parallel_requests")]
    pub parallel_requests: usize,

    /// Buffered rows that trigger a flush
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Table receiving error records
    #[serde(default = "default_error_table")]
    pub error_table: String,
}

fn default_page_size() -> u64 {
    1000
}

fn default_page_sizes() -> Vec<u64> {
    DEFAULT_PAGE_SIZES.to_vec()
}

fn default_parallel_requests() -> usize {
    8
}

fn default_batch_size() -> usize {
    8000
}

fn default_error_table() -> String {
    "sync_errors".to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            page_sizes: default_page_sizes(),
            parallel_requests: default_parallel_requests(),
            batch_size: default_batch_size(),
            error_table: default_error_table(),
        }
    }
}

impl SyncConfig {
    /// Create a new sync config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set page size
    #[must_use]
    pub fn with_page_size(mut self, size: u64) -> Self {
        self.page_size = size;
        self
    }

    /// Set the page size sequence
    #[must_use]
    pub fn with_page_sizes(mut self, sizes: Vec<u64>) -> Self {
        self.page_sizes = sizes;
        self
    }

    /// Set parallel requests per round
    #[must_use]
    pub fn with_parallel_requests(mut self, parallel: usize) -> Self {
        self.parallel_requests = parallel;
        self
    }

    /// Set batch size
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Check limits and the page size sequence
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::invalid_value("sync.page_size", "must be positive"));
        }
        if self.parallel_requests == 0 {
            return Err(Error::invalid_value("sync.parallel_requests", "must be positive"));
        }
        if self.batch_size == 0 {
            return Err(Error::invalid_value("sync.batch_size", "must be positive"));
        }
        if self.page_sizes.is_empty() || self.page_sizes.contains(&0) {
            return Err(Error::invalid_value(
                "sync.page_sizes",
                "must be a non-empty list of positive sizes",
            ));
        }
        if self.page_sizes.windows(2).any(|w| w[0] <= w[1]) {
            return Err(Error::invalid_value(
                "sync.page_sizes",
                "must be strictly descending",
            ));
        }
        if self.error_table.trim().is_empty() {
            return Err(Error::missing_field("sync.error_table"));
        }
        Ok(())
    }
}

/// Orchestrator phase for one entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// Cursor not loaded yet
    Fresh,
    /// Running a round
    Fetching,
    /// Emitting buffered rows and checkpointing
    Flushing,
    /// Emitting the final partial batch
    Draining,
    /// Entity finished and marked complete
    Done,
    /// Aborted on a fatal error
    Failed,
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Fresh => "FRESH",
            Self::Fetching => "FETCHING",
            Self::Flushing => "FLUSHING",
            Self::Draining => "DRAINING",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Modification date bounds applied to every request of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncWindow {
    /// Only records modified on or after this date
    pub modified_since: Option<String>,
    /// Only records modified on or before this date
    pub modified_until: Option<String>,
}

/// Statistics for one entity
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStats {
    /// Entity name
    pub entity: String,
    /// Rounds run
    pub rounds: usize,
    /// Page requests issued, including failed attempts
    pub requests: usize,
    /// Valid records fetched in this run
    pub records_fetched: usize,
    /// Total recorded in the cursor when the entity finished
    pub total_synced: i64,
    /// Rows handed to the destination, error rows included
    pub rows_emitted: usize,
    /// Windows given up on at the smallest page size
    pub error_records: usize,
    /// Flushes to the destination
    pub flushes: usize,
    /// Checkpoints written
    pub checkpoints: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl SyncStats {
    /// Create empty stats for an entity
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            ..Self::default()
        }
    }
}

/// Outcome of a full run across entities
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncReport {
    /// Entities synced in this run
    pub entities: Vec<SyncStats>,
    /// Entities already completed by an earlier, interrupted run
    pub skipped: Vec<String>,
    /// `last_sync_time` written at the end of the run
    pub last_sync_time: Option<String>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl SyncReport {
    /// Valid records fetched across entities
    pub fn total_records(&self) -> usize {
        self.entities.iter().map(|s| s.records_fetched).sum()
    }

    /// Error records across entities
    pub fn total_errors(&self) -> usize {
        self.entities.iter().map(|s| s.error_records).sum()
    }
}
