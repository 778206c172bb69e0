//! Configuration types for connector definitions
//!
//! A connector is described in YAML: where the API lives, how to talk to it,
//! how aggressively to fetch, and which entities to extract. Secrets and
//! per-run overrides live in a separate JSON run configuration so the
//! definition can be checked in.

use crate::engine::SyncConfig;
use crate::error::{Error, Result};
use crate::http::{HttpClientConfig, RateLimiterConfig};
use crate::types::{BackoffType, Method, StringMap};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Top-Level Connector Config
// ============================================================================

/// Complete connector configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Connector name (e.g. "virtuous")
    pub name: String,

    /// Base URL for API requests
    pub base_url: String,

    /// HTTP client configuration
    #[serde(default)]
    pub http: HttpConfig,

    /// Fetch/flush tuning
    #[serde(default)]
    pub sync: SyncConfig,

    /// Entities to extract, synced in order
    #[serde(default)]
    pub entities: Vec<EntityConfig>,
}

impl ConnectorConfig {
    /// Parse a connector definition from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a connector definition from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Validate the definition
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::missing_field("base_url"));
        }
        url::Url::parse(&self.base_url)?;

        if self.entities.is_empty() {
            return Err(Error::invalid_value("entities", "at least one entity is required"));
        }

        let mut seen = std::collections::HashSet::new();
        for entity in &self.entities {
            if entity.name.trim().is_empty() {
                return Err(Error::missing_field("entities[].name"));
            }
            if !seen.insert(entity.name.as_str()) {
                return Err(Error::invalid_value(
                    "entities",
                    format!("duplicate entity '{}'", entity.name),
                ));
            }
        }

        self.sync.validate()
    }

    /// Look up an entity by name
    pub fn entity(&self, name: &str) -> Result<&EntityConfig> {
        self.entities
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| Error::EntityNotFound {
                entity: name.to_string(),
            })
    }

    /// Select entities by name, preserving definition order; `None` selects all
    pub fn select_entities(&self, names: Option<&[String]>) -> Result<Vec<&EntityConfig>> {
        match names {
            None => Ok(self.entities.iter().collect()),
            Some(names) => {
                for name in names {
                    self.entity(name)?;
                }
                Ok(self
                    .entities
                    .iter()
                    .filter(|e| names.contains(&e.name))
                    .collect())
            }
        }
    }
}

// ============================================================================
// HTTP Config
// ============================================================================

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Transport-level retries before an error reaches the page fetcher
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff between transport retries
    #[serde(default)]
    pub backoff: BackoffConfig,

    /// Optional client-side rate limit
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,

    /// Headers sent with every request
    #[serde(default)]
    pub headers: StringMap,
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            backoff: BackoffConfig::default(),
            rate_limit: None,
            headers: StringMap::new(),
        }
    }
}

impl HttpConfig {
    /// Build the client configuration, layering run headers over defaults
    pub fn to_client_config(&self, base_url: &str, extra_headers: &StringMap) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder()
            .base_url(base_url)
            .timeout(Duration::from_secs(self.timeout_secs))
            .max_retries(self.max_retries)
            .backoff(
                self.backoff.backoff_type,
                Duration::from_millis(self.backoff.initial_ms),
                Duration::from_millis(self.backoff.max_ms),
            );

        builder = match &self.rate_limit {
            Some(limit) => builder.rate_limit(RateLimiterConfig::new(
                limit.requests_per_second,
                limit.burst_size,
            )),
            None => builder.no_rate_limit(),
        };

        for (key, value) in self.headers.iter().chain(extra_headers) {
            builder = builder.header(key, value);
        }

        builder.build()
    }
}

/// Backoff configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Backoff strategy
    #[serde(default, rename = "type")]
    pub backoff_type: BackoffType,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_backoff")]
    pub initial_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_backoff")]
    pub max_ms: u64,
}

fn default_initial_backoff() -> u64 {
    2000
}

fn default_max_backoff() -> u64 {
    60_000
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            backoff_type: BackoffType::Exponential,
            initial_ms: default_initial_backoff(),
            max_ms: default_max_backoff(),
        }
    }
}

/// Rate limit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests per second
    pub requests_per_second: u32,

    /// Burst size
    #[serde(default = "default_burst")]
    pub burst_size: u32,
}

fn default_burst() -> u32 {
    10
}

// ============================================================================
// Entity Config
// ============================================================================

/// One paginated list endpoint and where its records go
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityConfig {
    /// Entity name, also the prefix of its state keys
    pub name: String,

    /// Request path relative to the base URL
    pub path: String,

    /// HTTP method
    #[serde(default)]
    pub method: Method,

    /// Destination table (defaults to the entity name)
    #[serde(default)]
    pub table: Option<String>,

    /// Field holding the integer primary key (dot notation allowed)
    #[serde(default = "default_id_field")]
    pub id_field: String,

    /// Dot path to the record array in the response body
    #[serde(default)]
    pub records_path: Option<String>,

    /// Query parameter carrying the offset
    #[serde(default = "default_skip_param")]
    pub skip_param: String,

    /// Query parameter carrying the page size
    #[serde(default = "default_take_param")]
    pub take_param: String,

    /// How id and modification filters are expressed
    #[serde(default)]
    pub filter: FilterStyle,

    /// Nested collections split out into their own tables
    #[serde(default)]
    pub children: Vec<ChildTableConfig>,
}

fn default_id_field() -> String {
    "id".to_string()
}

fn default_skip_param() -> String {
    "skip".to_string()
}

fn default_take_param() -> String {
    "take".to_string()
}

impl EntityConfig {
    /// Create an entity with defaults for everything but name and path
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            method: Method::GET,
            table: None,
            id_field: default_id_field(),
            records_path: None,
            skip_param: default_skip_param(),
            take_param: default_take_param(),
            filter: FilterStyle::default(),
            children: Vec::new(),
        }
    }

    /// Destination table for top-level records
    pub fn table_name(&self) -> &str {
        self.table.as_deref().unwrap_or(&self.name)
    }
}

/// Filter encoding understood by the upstream API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum FilterStyle {
    /// Filters as query parameters (`?id_gt=..&modified_since=..`)
    QueryParams {
        #[serde(default = "default_id_param")]
        id_param: String,
        #[serde(default = "default_since_param")]
        modified_since_param: String,
        #[serde(default = "default_until_param")]
        modified_until_param: String,
    },
    /// Filters as a JSON body of query conditions
    Conditions {
        #[serde(default)]
        sort_by: Option<String>,
        #[serde(default = "default_id_parameter")]
        id_parameter: String,
        #[serde(default = "default_modified_parameter")]
        modified_parameter: String,
    },
}

fn default_id_param() -> String {
    "id_gt".to_string()
}

fn default_since_param() -> String {
    "modified_since".to_string()
}

fn default_until_param() -> String {
    "modified_until".to_string()
}

fn default_id_parameter() -> String {
    "Id".to_string()
}

fn default_modified_parameter() -> String {
    "Last Modified Date".to_string()
}

impl Default for FilterStyle {
    fn default() -> Self {
        Self::QueryParams {
            id_param: default_id_param(),
            modified_since_param: default_since_param(),
            modified_until_param: default_until_param(),
        }
    }
}

/// A nested array or object lifted into its own table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildTableConfig {
    /// Field on the parent record holding the child(ren)
    pub field: String,

    /// Destination table
    pub table: String,

    /// Column added to each child row referencing the parent id
    pub foreign_key: String,
}

// ============================================================================
// Run Config
// ============================================================================

/// Per-run configuration supplied as JSON
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    /// Extra headers (credentials go here)
    #[serde(default)]
    pub headers: StringMap,

    /// Override `modified_since` for this run
    #[serde(default)]
    pub debug_start_date: Option<String>,

    /// Upper bound on modification date for this run
    #[serde(default)]
    pub debug_end_date: Option<String>,
}

impl RunConfig {
    /// Parse from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::config(format!("Invalid config JSON: {e}")))
    }

    /// Whether a debug window overrides the persisted sync time
    pub fn is_debug_mode(&self) -> bool {
        self.debug_start_date.is_some()
    }
}
