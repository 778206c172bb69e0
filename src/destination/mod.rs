//! Destination module
//!
//! Where flushed rows go. Delivery is at-least-once: after a crash, rows
//! emitted since the last checkpoint are emitted again, so a destination
//! must upsert by primary key rather than append blindly.
//!
//! # Overview
//!
//! - `Destination` - The emit interface
//! - `MemoryDestination` - Upserting in-memory tables
//! - `JsonLinesDestination` - One JSON line per row, to stdout or a file

mod jsonl;
mod memory;

pub use jsonl::JsonLinesDestination;
pub use memory::MemoryDestination;

use crate::error::Result;
use crate::types::TableRow;
use async_trait::async_trait;

/// Receiver of flushed rows
#[async_trait]
pub trait Destination: Send + Sync {
    /// Upsert `rows`; must be durable when this returns
    async fn emit(&self, rows: &[TableRow]) -> Result<()>;
}
