//! Record mapping module
//!
//! Turns one raw upstream record into the rows it contributes to the
//! destination. A single record can fan out into several tables (a contact
//! and its addresses, say), and every resulting row counts towards the
//! batch size.
//!
//! # Overview
//!
//! - `RecordMapper` - The mapping interface; must be pure and total
//! - `PassthroughMapper` - snake_case columns plus configured child tables
//! - `FnMapper` - Wraps a closure

mod passthrough;

pub use passthrough::{to_snake_case, PassthroughMapper};

use crate::types::{RawRecord, TableRow};

/// Maps a raw record to destination rows
pub trait RecordMapper: Send + Sync {
    /// Rows contributed by `record`, parent row first
    fn map(&self, record: &RawRecord) -> Vec<TableRow>;
}

/// Mapper backed by a closure
pub struct FnMapper<F> {
    f: F,
}

impl<F> FnMapper<F>
where
    F: Fn(&RawRecord) -> Vec<TableRow> + Send + Sync,
{
    /// Wrap `f`
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> RecordMapper for FnMapper<F>
where
    F: Fn(&RawRecord) -> Vec<TableRow> + Send + Sync,
{
    fn map(&self, record: &RawRecord) -> Vec<TableRow> {
        (self.f)(record)
    }
}

impl<F> std::fmt::Debug for FnMapper<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnMapper").finish_non_exhaustive()
    }
}
