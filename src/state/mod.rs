//! State management module
//!
//! Handles cursor tracking, checkpointing, and resumability.
//! State is persisted between sync runs to enable incremental syncs.
//!
//! # Overview
//!
//! The state module provides:
//! - `Cursor` - Id watermark and record count for one entity
//! - `SyncState` - The flat key/value map that gets checkpointed
//! - `CheckpointStore` - Durable persistence (file or memory)

mod store;
mod types;

pub use store::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
pub use types::{Cursor, SyncState};
