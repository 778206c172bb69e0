//! In-memory upserting destination

use super::Destination;
use crate::error::Result;
use crate::types::{OutputRow, TableRow};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

type Tables = BTreeMap<String, BTreeMap<String, OutputRow>>;

/// Tables of rows keyed by primary key
///
/// Rows are keyed by their `id` column; rows without one are keyed by their
/// full content, so re-emitting an identical row is still a no-op.
#[derive(Debug)]
pub struct MemoryDestination {
    key_field: String,
    tables: RwLock<Tables>,
    emitted: AtomicUsize,
}

impl Default for MemoryDestination {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDestination {
    /// Create an empty destination keyed on `id`
    pub fn new() -> Self {
        Self::with_key_field("id")
    }

    /// Create an empty destination keyed on `key_field`
    pub fn with_key_field(key_field: impl Into<String>) -> Self {
        Self {
            key_field: key_field.into(),
            tables: RwLock::new(BTreeMap::new()),
            emitted: AtomicUsize::new(0),
        }
    }

    /// Rows of a table in key order
    pub async fn rows(&self, table: &str) -> Vec<OutputRow> {
        self.tables
            .read()
            .await
            .get(table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    /// A single row by primary key
    pub async fn row(&self, table: &str, key: &str) -> Option<OutputRow> {
        self.tables.read().await.get(table)?.get(key).cloned()
    }

    /// Distinct rows in a table
    pub async fn table_len(&self, table: &str) -> usize {
        self.tables.read().await.get(table).map_or(0, BTreeMap::len)
    }

    /// Every table
    pub async fn snapshot(&self) -> Tables {
        self.tables.read().await.clone()
    }

    /// Rows received, counting re-emissions
    pub fn emitted(&self) -> usize {
        self.emitted.load(Ordering::SeqCst)
    }

    fn key_of(&self, row: &TableRow) -> String {
        row.primary_key(&self.key_field)
            .unwrap_or_else(|| serde_json::Value::Object(row.row.clone()).to_string())
    }
}

#[async_trait]
impl Destination for MemoryDestination {
    async fn emit(&self, rows: &[TableRow]) -> Result<()> {
        let mut tables = self.tables.write().await;
        for row in rows {
            let key = self.key_of(row);
            tables
                .entry(row.table.clone())
                .or_default()
                .insert(key, row.row.clone());
        }
        self.emitted.fetch_add(rows.len(), Ordering::SeqCst);
        Ok(())
    }
}
