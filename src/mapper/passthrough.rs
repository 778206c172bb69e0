//! Generic record mapper
//!
//! Keeps every top-level field, renamed to snake_case. Nested objects and
//! arrays are stored as JSON strings, except for configured child fields,
//! which become rows of their own table carrying the parent id.

use super::RecordMapper;
use crate::config::{ChildTableConfig, EntityConfig};
use crate::types::{JsonObject, JsonValue, OutputRow, RawRecord, TableRow};

/// Maps records field by field with no entity-specific knowledge
#[derive(Debug, Clone)]
pub struct PassthroughMapper {
    table: String,
    id_field: String,
    children: Vec<ChildTableConfig>,
}

impl PassthroughMapper {
    /// Map into `table`, taking the parent id from `id`
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            id_field: "id".to_string(),
            children: Vec::new(),
        }
    }

    /// Mapper for an entity's table, id field and child tables
    pub fn from_entity(entity: &EntityConfig) -> Self {
        Self {
            table: entity.table_name().to_string(),
            id_field: entity.id_field.clone(),
            children: entity.children.clone(),
        }
    }

    /// Set the field holding the parent id
    #[must_use]
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    /// Split `child.field` into its own table
    #[must_use]
    pub fn with_child(mut self, child: ChildTableConfig) -> Self {
        self.children.push(child);
        self
    }
}

impl RecordMapper for PassthroughMapper {
    fn map(&self, record: &RawRecord) -> Vec<TableRow> {
        let parent_id = record
            .get_path(&self.id_field)
            .cloned()
            .unwrap_or(JsonValue::Null);

        let parent: OutputRow = record
            .as_object()
            .iter()
            .filter(|(key, _)| !self.children.iter().any(|c| c.field == **key))
            .map(|(key, value)| (to_snake_case(key), flatten(value)))
            .collect();

        let mut rows = vec![TableRow::new(self.table.clone(), parent)];
        for child in &self.children {
            if let Some(value) = record.get(&child.field) {
                rows.extend(child_rows(child, value, &parent_id));
            }
        }
        rows
    }
}

fn child_rows(child: &ChildTableConfig, value: &JsonValue, parent_id: &JsonValue) -> Vec<TableRow> {
    let objects: Vec<&JsonObject> = match value {
        JsonValue::Array(items) => items.iter().filter_map(JsonValue::as_object).collect(),
        JsonValue::Object(object) => vec![object],
        _ => Vec::new(),
    };

    objects
        .into_iter()
        .map(|object| {
            let mut row: OutputRow = object
                .iter()
                .map(|(k, v)| (to_snake_case(k), flatten(v)))
                .collect();
            row.insert(child.foreign_key.clone(), parent_id.clone());
            TableRow::new(child.table.clone(), row)
        })
        .collect()
}

/// Scalars pass through; nested structures become JSON text
fn flatten(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(_) | JsonValue::Array(_) => JsonValue::String(value.to_string()),
        other => other.clone(),
    }
}

/// Convert `camelCase`, `PascalCase` or `Spaced Words` to `snake_case`
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                // Last capital of an acronym: "ABCValue" -> "abc_value"
                Some(p) if p.is_uppercase() => next.is_some_and(char::is_lowercase),
                _ => false,
            };
            if boundary && !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else if c.is_alphanumeric() {
            out.push(c);
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }

    while out.ends_with('_') {
        out.pop();
    }
    out
}
