//! Error types for Solidafy Extract
//!
//! This module defines the error hierarchy for the whole crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! The sync engine cares about exactly one distinction: whether an error is
//! retryable (transient transport/server trouble, handled by shrinking the
//! page size) or fatal (aborts the run). [`Error::is_retryable`] is the single
//! place that decision is made.

use thiserror::Error;

/// The main error type for Solidafy Extract
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Rate limited, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Data Processing Errors
    // ============================================================================
    #[error("Failed to extract records from path '{path}': {message}")]
    RecordExtraction { path: String, message: String },

    #[error("Malformed record in page: {message}")]
    MalformedRecord { message: String },

    // ============================================================================
    // State Errors
    // ============================================================================
    #[error("State error: {message}")]
    State { message: String },

    #[error("Checkpoint failed: {message}")]
    Checkpoint { message: String },

    // ============================================================================
    // Destination Errors
    // ============================================================================
    #[error("Destination error: {message}")]
    Destination { message: String },

    // ============================================================================
    // Sync Errors
    // ============================================================================
    #[error("Entity '{entity}' not found in connector definition")]
    EntityNotFound { entity: String },

    #[error("No progress for '{entity}' past id {cursor:?}: {error_records} windows failed at the smallest page size")]
    NoProgress {
        entity: String,
        cursor: Option<i64>,
        error_records: usize,
    },

    #[error("No record in a page of '{entity}' has an integer '{id_field}'")]
    MissingPrimaryKey { entity: String, id_field: String },

    #[error("Sync of '{entity}' failed after {records_synced} records: {source}")]
    SyncFailed {
        entity: String,
        records_synced: i64,
        #[source]
        source: Box<Error>,
    },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Create a checkpoint error
    pub fn checkpoint(message: impl Into<String>) -> Self {
        Self::Checkpoint {
            message: message.into(),
        }
    }

    /// Create a destination error
    pub fn destination(message: impl Into<String>) -> Self {
        Self::Destination {
            message: message.into(),
        }
    }

    /// Wrap a fatal error with the progress made before it happened
    pub fn sync_failed(entity: impl Into<String>, records_synced: i64, source: Error) -> Self {
        Self::SyncFailed {
            entity: entity.into(),
            records_synced,
            source: Box::new(source),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => !e.is_builder(),
            Error::RateLimited { .. } | Error::Timeout { .. } => true,
            Error::MalformedRecord { .. } => true,
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }
}

/// Check if an HTTP status code is retryable
pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(
        status,
        429 | 500 | 502 | 503 | 504 | 520 | 521 | 522 | 523 | 524
    )
}

/// Result type alias for Solidafy Extract
pub type Result<T> = std::result::Result<T, Error>;
