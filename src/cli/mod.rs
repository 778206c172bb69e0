//! CLI module
//!
//! Command-line interface for running syncs.
//!
//! # Commands
//!
//! - `sync` - Sync entities, resuming from persisted state
//! - `check` - Fetch one record per entity
//! - `state` - Print persisted state
//! - `reset` - Clear persisted state
//! - `validate` - Validate the connector definition

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
