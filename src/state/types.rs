//! State types for tracking sync progress
//!
//! Persisted state is a flat JSON object so that it can be inspected and
//! edited by hand:
//!
//! ```json
//! {
//!   "gifts_id_cursor": 48211,
//!   "gifts_total_synced": 12000,
//!   "contacts_complete": true,
//!   "sync_started_at": "2024-05-01T10:00:00+00:00",
//!   "last_sync_time": "2024-04-30T10:00:00+00:00"
//! }
//! ```

use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue};
use serde::{Deserialize, Serialize};

const ID_CURSOR_SUFFIX: &str = "_id_cursor";
const TOTAL_SYNCED_SUFFIX: &str = "_total_synced";
const COMPLETE_SUFFIX: &str = "_complete";
const LAST_SYNC_TIME: &str = "last_sync_time";
const SYNC_STARTED_AT: &str = "sync_started_at";

/// Position of one entity within a sync run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Entity type
    pub entity_type: String,
    /// Highest primary key successfully fetched
    pub last_id: Option<i64>,
    /// Valid records fetched so far
    pub total_synced: i64,
}

impl Cursor {
    /// Cursor with no prior progress
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            last_id: None,
            total_synced: 0,
        }
    }

    /// Account for a completed round
    ///
    /// `last_id` only ever moves forward.
    pub fn advance(&mut self, max_id_seen: Option<i64>, records: usize) {
        if let Some(seen) = max_id_seen {
            self.last_id = Some(self.last_id.map_or(seen, |last| last.max(seen)));
        }
        self.total_synced += records as i64;
    }
}

/// Complete persisted state for a connector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncState(JsonObject);

impl SyncState {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse state from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::state(format!("Failed to parse state: {e}")))
    }

    /// Serialize as pretty JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::state(format!("Failed to serialize state: {e}")))
    }

    /// Raw value for a key
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    /// Underlying map
    pub fn as_map(&self) -> &JsonObject {
        &self.0
    }

    /// Whether nothing has been persisted
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Cursor for an entity
    ///
    /// Missing keys, and values of the wrong type, mean no prior progress.
    pub fn load_cursor(&self, entity: &str) -> Cursor {
        let last_id = self
            .0
            .get(&key(entity, ID_CURSOR_SUFFIX))
            .and_then(JsonValue::as_i64);
        let total_synced = self
            .0
            .get(&key(entity, TOTAL_SYNCED_SUFFIX))
            .and_then(JsonValue::as_i64)
            .unwrap_or(0);

        Cursor {
            entity_type: entity.to_string(),
            last_id,
            total_synced,
        }
    }

    /// Merge a cursor into the state, leaving other entities untouched
    pub fn save_cursor(&mut self, cursor: &Cursor) {
        self.0.insert(
            key(&cursor.entity_type, ID_CURSOR_SUFFIX),
            cursor.last_id.map_or(JsonValue::Null, JsonValue::from),
        );
        self.0.insert(
            key(&cursor.entity_type, TOTAL_SYNCED_SUFFIX),
            JsonValue::from(cursor.total_synced),
        );
    }

    /// Remove an entity's cursor fields
    pub fn clear_cursor(&mut self, entity: &str) {
        self.0.remove(&key(entity, ID_CURSOR_SUFFIX));
        self.0.remove(&key(entity, TOTAL_SYNCED_SUFFIX));
    }

    /// Whether an entity finished during the current run
    pub fn is_complete(&self, entity: &str) -> bool {
        self.0
            .get(&key(entity, COMPLETE_SUFFIX))
            .and_then(JsonValue::as_bool)
            .unwrap_or(false)
    }

    /// Mark an entity finished and drop its cursor
    pub fn mark_complete(&mut self, entity: &str) {
        self.clear_cursor(entity);
        self.0
            .insert(key(entity, COMPLETE_SUFFIX), JsonValue::Bool(true));
    }

    /// Remove every `<entity>_complete` marker
    pub fn clear_completion_markers(&mut self) {
        self.0.retain(|k, _| !k.ends_with(COMPLETE_SUFFIX));
    }

    /// Remove everything stored for an entity
    pub fn clear_entity(&mut self, entity: &str) {
        self.clear_cursor(entity);
        self.0.remove(&key(entity, COMPLETE_SUFFIX));
    }

    /// Entities with an in-progress cursor
    pub fn entities_in_progress(&self) -> Vec<String> {
        self.0
            .keys()
            .filter_map(|k| k.strip_suffix(TOTAL_SYNCED_SUFFIX))
            .map(str::to_string)
            .collect()
    }

    /// Start of the last fully successful run
    pub fn last_sync_time(&self) -> Option<&str> {
        self.0.get(LAST_SYNC_TIME).and_then(JsonValue::as_str)
    }

    /// Set the start of the last fully successful run
    pub fn set_last_sync_time(&mut self, time: impl Into<String>) {
        self.0
            .insert(LAST_SYNC_TIME.to_string(), JsonValue::String(time.into()));
    }

    /// Start of the run in progress, if any
    pub fn sync_started_at(&self) -> Option<&str> {
        self.0.get(SYNC_STARTED_AT).and_then(JsonValue::as_str)
    }

    /// Record the start of a run
    pub fn set_sync_started_at(&mut self, time: impl Into<String>) {
        self.0
            .insert(SYNC_STARTED_AT.to_string(), JsonValue::String(time.into()));
    }

    /// Forget the run in progress
    pub fn clear_sync_started_at(&mut self) {
        self.0.remove(SYNC_STARTED_AT);
    }
}

fn key(entity: &str, suffix: &str) -> String {
    format!("{entity}{suffix}")
}
