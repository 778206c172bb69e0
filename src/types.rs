//! Common types used throughout Solidafy Extract
//!
//! This module contains shared type definitions, type aliases,
//! and the record shapes that cross the extraction boundary.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// Generic key-value map with string keys and values
pub type StringMap = HashMap<String, String>;

/// One row headed for a destination table, keyed by column name
pub type OutputRow = JsonObject;

// ============================================================================
// Records
// ============================================================================

/// A record as returned by the upstream API
///
/// Upstream payloads are untyped JSON objects. The only field the engine
/// itself interprets is the primary key (see [`RawRecord::id`]); every other
/// field is opaque until a mapper turns the record into [`TableRow`]s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(JsonObject);

impl RawRecord {
    /// Wrap a JSON object
    pub fn new(fields: JsonObject) -> Self {
        Self(fields)
    }

    /// Convert a JSON value, rejecting anything that isn't an object
    pub fn from_value(value: JsonValue) -> Option<Self> {
        match value {
            JsonValue::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Get a top-level field
    pub fn get(&self, field: &str) -> Option<&JsonValue> {
        self.0.get(field)
    }

    /// Get a nested field using dot notation (e.g. `address.city`)
    pub fn get_path(&self, path: &str) -> Option<&JsonValue> {
        let mut parts = path.split('.');
        let mut current = self.0.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// Primary key of this record
    ///
    /// Accepts integer values and numeric strings; anything else yields
    /// `None` and the record does not participate in cursor advancement.
    pub fn id(&self, id_field: &str) -> Option<i64> {
        match self.get_path(id_field)? {
            JsonValue::Number(n) => n.as_i64(),
            JsonValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Borrow the underlying object
    pub fn as_object(&self) -> &JsonObject {
        &self.0
    }

    /// Consume into the underlying object
    pub fn into_inner(self) -> JsonObject {
        self.0
    }
}

impl From<JsonObject> for RawRecord {
    fn from(fields: JsonObject) -> Self {
        Self(fields)
    }
}

/// A transformed row together with its destination table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    /// Destination table name
    pub table: String,
    /// Column values
    pub row: OutputRow,
}

impl TableRow {
    /// Create a new table row
    pub fn new(table: impl Into<String>, row: OutputRow) -> Self {
        Self {
            table: table.into(),
            row,
        }
    }

    /// Render the value of `key_field` as an upsert key
    pub fn primary_key(&self, key_field: &str) -> Option<String> {
        match self.row.get(key_field)? {
            JsonValue::Null => None,
            JsonValue::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

// ============================================================================
// HTTP Types
// ============================================================================

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    GET,
    POST,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => reqwest::Method::GET,
            Method::POST => reqwest::Method::POST,
        }
    }
}

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}
