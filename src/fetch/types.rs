//! Fetch types
//!
//! Windows describe outstanding requests; outcomes describe what came back.

use crate::source::RequestDescription;
use crate::types::{JsonValue, OutputRow, RawRecord, TableRow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// One outstanding request against an entity's filtered record list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchWindow {
    /// Entity being fetched
    pub entity_type: String,
    /// Offset within the filtered view
    pub skip: u64,
    /// Page size
    pub take: u64,
    /// Only records with a primary key above this value
    pub id_cursor: Option<i64>,
    /// Only records modified on or after this date
    pub modified_since: Option<String>,
    /// Only records modified on or before this date
    pub modified_until: Option<String>,
}

impl FetchWindow {
    /// Create a window at offset zero with no filters
    pub fn new(entity_type: impl Into<String>, take: u64) -> Self {
        Self {
            entity_type: entity_type.into(),
            skip: 0,
            take,
            id_cursor: None,
            modified_since: None,
            modified_until: None,
        }
    }

    /// Set the id filter
    #[must_use]
    pub fn with_id_cursor(mut self, id_cursor: Option<i64>) -> Self {
        self.id_cursor = id_cursor;
        self
    }

    /// Set the modification date range
    #[must_use]
    pub fn with_modified_range(mut self, since: Option<String>, until: Option<String>) -> Self {
        self.modified_since = since;
        self.modified_until = until;
        self
    }

    /// Same filters, different position
    pub fn at(&self, skip: u64, take: u64) -> Self {
        Self {
            skip,
            take,
            ..self.clone()
        }
    }
}

/// A window that kept failing at the smallest page size
///
/// Routed to the error table instead of aborting the run. Never contributes
/// to cursor advancement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Entity being fetched
    pub entity_type: String,
    /// Request URL including pagination parameters
    pub url: String,
    /// Request body, if any
    pub request_body: Option<JsonValue>,
    /// Last error seen for this window
    pub error_message: String,
    /// Offset of the failed window
    pub skip: u64,
    /// Size of the failed window
    pub take: u64,
    /// Id filter the window was issued under
    pub id_cursor: Option<i64>,
    /// When the window was given up on
    pub failed_at: DateTime<Utc>,
}

impl ErrorRecord {
    /// Record a failed window
    pub fn new(window: &FetchWindow, request: RequestDescription, error_message: String) -> Self {
        Self {
            entity_type: window.entity_type.clone(),
            url: request.url,
            request_body: request.body,
            error_message,
            skip: window.skip,
            take: window.take,
            id_cursor: window.id_cursor,
            failed_at: Utc::now(),
        }
    }

    /// Stable key so re-emitting the same failure upserts one row
    pub fn key(&self) -> String {
        let cursor = self
            .id_cursor
            .map_or_else(|| "start".to_string(), |id| id.to_string());
        format!("{}:{}:{}:{}", self.entity_type, cursor, self.skip, self.take)
    }

    /// Convert into a row for the error table
    pub fn into_table_row(self, table: &str) -> TableRow {
        let row = json!({
            "id": self.key(),
            "entity": self.entity_type,
            "url": self.url,
            "request_body": self.request_body.map(|b| b.to_string()),
            "error_message": self.error_message,
            "skip": self.skip,
            "take": self.take,
            "id_cursor": self.id_cursor,
            "failed_at": self.failed_at.to_rfc3339(),
        });
        let row = match row {
            JsonValue::Object(map) => map,
            _ => OutputRow::new(),
        };
        TableRow::new(table, row)
    }
}

/// Result of fetching one window, possibly split into sub-windows
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    /// Records in offset order
    pub records: Vec<RawRecord>,
    /// Sub-windows that failed at the smallest page size
    pub errors: Vec<ErrorRecord>,
    /// A successful (sub-)window came back short
    pub end_of_data: bool,
    /// Requests issued, including failed attempts
    pub requests: usize,
}

/// Result of one bounded-parallel round
#[derive(Debug, Clone, Default)]
pub struct RoundResult {
    /// Valid records, in logical (offset) order
    pub records: Vec<RawRecord>,
    /// Error records from the slots that were kept
    pub errors: Vec<ErrorRecord>,
    /// Largest primary key among `records`
    pub max_id_seen: Option<i64>,
    /// End-of-stream was observed in this round
    pub reached_end: bool,
    /// Requests issued across all slots
    pub requests: usize,
    /// Slots whose results were kept
    pub slots_used: usize,
}
