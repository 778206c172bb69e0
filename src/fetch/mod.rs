//! Fetch module
//!
//! Turns a cursor into records, one bounded-parallel round at a time.
//!
//! # Overview
//!
//! - `PageFetcher` - fetches one window, shrinking the page size on transient
//!   failure until the failing window is isolated; exhaustion yields an
//!   `ErrorRecord` instead of an error
//! - `ParallelFetchCoordinator` - issues a fixed number of windows
//!   concurrently, reorders them by offset, and detects end-of-stream
//!
//! ```text
//!   cursor ──► slot 0: skip 0      ──┐
//!              slot 1: skip 1*page ──┤ concurrent
//!              ...                   │
//!              slot N: skip N*page ──┘
//!                      │ wait for all, sort by skip
//!                      ▼
//!   records (logical order), error records, max id, reached_end
//! ```

mod page;
mod parallel;
mod types;

pub use page::{PageFetcher, DEFAULT_PAGE_SIZES};
pub use parallel::ParallelFetchCoordinator;
pub use types::{ErrorRecord, FetchOutcome, FetchWindow, RoundResult};

#[cfg(test)]
mod tests;
