//! Page source trait and response types

use crate::error::Result;
use crate::fetch::FetchWindow;
use crate::types::{JsonValue, RawRecord};
use async_trait::async_trait;

/// One page of records as returned by the upstream API
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// Records in upstream order (ascending primary key)
    pub records: Vec<RawRecord>,
    /// Whether the API reports more records past this page
    pub more: bool,
}

impl Page {
    /// Create a page
    pub fn new(records: Vec<RawRecord>, more: bool) -> Self {
        Self { records, more }
    }

    /// An empty final page
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Enough of a request to reproduce it by hand
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescription {
    /// Full request URL including pagination parameters
    pub url: String,
    /// JSON body, if the request has one
    pub body: Option<JsonValue>,
}

/// Paginated list endpoint
///
/// Implementations must return records with primary key greater than
/// `window.id_cursor` (when set), sorted ascending by primary key, starting
/// at offset `window.skip` within that filtered view.
///
/// Errors must be classified: transient failures (429, 5xx, connection
/// resets) as retryable per [`Error::is_retryable`](crate::Error::is_retryable),
/// everything else as fatal.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch one window of records
    async fn query_page(&self, window: &FetchWindow) -> Result<Page>;

    /// Describe the request that serves `window`, for error records
    fn describe(&self, window: &FetchWindow) -> RequestDescription {
        RequestDescription {
            url: format!(
                "{}?skip={}&take={}",
                window.entity_type, window.skip, window.take
            ),
            body: None,
        }
    }
}
