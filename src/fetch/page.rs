//! Adaptive page fetching
//!
//! A transient failure usually means the page is too expensive for the
//! server, or that one poisoned record breaks serialisation of the whole
//! page. Either way, retrying the same request is pointless. Instead the
//! failed window is split into smaller contiguous windows, down a fixed
//! sequence of page sizes, until the failure is isolated to a window of the
//! smallest size. That window becomes an [`ErrorRecord`] and fetching moves on.
//!
//! Splits are kept on an explicit stack rather than by recursion, so nesting
//! is bounded by the length of the page size sequence.

use super::types::{ErrorRecord, FetchOutcome, FetchWindow};
use crate::error::Result;
use crate::source::PageSource;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Default descending page size sequence
pub const DEFAULT_PAGE_SIZES: [u64; 6] = [1000, 500, 250, 50, 10, 1];

/// Fetches one window with adaptive page-size shrinking
pub struct PageFetcher<S: ?Sized> {
    source: Arc<S>,
    page_sizes: Vec<u64>,
}

impl<S: PageSource + ?Sized> PageFetcher<S> {
    /// Create a fetcher over `source` using a descending page size sequence
    pub fn new(source: Arc<S>, page_sizes: Vec<u64>) -> Self {
        Self { source, page_sizes }
    }

    /// Create a fetcher with [`DEFAULT_PAGE_SIZES`]
    pub fn with_default_sizes(source: Arc<S>) -> Self {
        Self::new(source, DEFAULT_PAGE_SIZES.to_vec())
    }

    /// The page source
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Next page size strictly smaller than `take`
    pub fn next_smaller(&self, take: u64) -> Option<u64> {
        self.page_sizes.iter().copied().find(|&size| size < take)
    }

    /// Fetch `window`
    ///
    /// Never fails on retryable errors: those shrink the page size, and a
    /// window still failing at the smallest size becomes an error record.
    /// Fatal errors are returned immediately.
    pub async fn fetch(&self, window: &FetchWindow) -> Result<FetchOutcome> {
        let mut outcome = FetchOutcome::default();
        let mut pending = vec![window.clone()];

        while let Some(current) = pending.pop() {
            outcome.requests += 1;

            let error = match self.source.query_page(&current).await {
                Ok(page) => {
                    let short = (page.records.len() as u64) < current.take || !page.more;
                    debug!(
                        "{} skip={} take={}: {} records",
                        current.entity_type,
                        current.skip,
                        current.take,
                        page.records.len()
                    );
                    outcome.records.extend(page.records);

                    if short {
                        outcome.end_of_data = true;
                        // Past the end nothing is left to fetch, unless an
                        // earlier window failed and the offsets can't be trusted.
                        if outcome.errors.is_empty() {
                            pending.clear();
                        }
                    }
                    continue;
                }
                Err(e) if e.is_retryable() => e,
                Err(e) => return Err(e),
            };

            match self.next_smaller(current.take) {
                Some(smaller) => {
                    let splits = current.take.div_ceil(smaller);
                    warn!(
                        "Error at {} skip={}, take={}. Splitting into {} calls of take={}: {}",
                        current.entity_type, current.skip, current.take, splits, smaller, error
                    );
                    for i in (0..splits).rev() {
                        let offset = i * smaller;
                        let take = smaller.min(current.take - offset);
                        pending.push(current.at(current.skip + offset, take));
                    }
                }
                None => {
                    error!(
                        "All page sizes exhausted for {} at skip={}, take={}: {}",
                        current.entity_type, current.skip, current.take, error
                    );
                    let request = self.source.describe(&current);
                    outcome
                        .errors
                        .push(ErrorRecord::new(&current, request, error.to_string()));
                }
            }
        }

        Ok(outcome)
    }
}

impl<S: ?Sized> std::fmt::Debug for PageFetcher<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageFetcher")
            .field("page_sizes", &self.page_sizes)
            .finish_non_exhaustive()
    }
}
