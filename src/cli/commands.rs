//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Incremental extraction CLI
#[derive(Parser, Debug)]
#[command(name = "solidafy-extract")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Connector definition file (YAML)
    #[arg(short, long, global = true)]
    pub connector: Option<PathBuf>,

    /// Run configuration file (JSON)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Inline run configuration JSON
    #[arg(long, global = true)]
    pub config_json: Option<String>,

    /// State file (JSON)
    #[arg(short, long, global = true, default_value = "state.json")]
    pub state: PathBuf,

    /// Output format for reports and messages
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sync entities from their persisted cursors
    Sync {
        /// Entities to sync (comma-separated, empty = all)
        #[arg(long, value_delimiter = ',')]
        entities: Vec<String>,

        /// Append rows to this JSON lines file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fetch a single record of every entity
    Check,

    /// Print the persisted state
    State,

    /// Clear persisted state
    Reset {
        /// Only clear this entity's cursor and completion marker
        #[arg(long)]
        entity: Option<String>,
    },

    /// Validate the connector definition
    Validate,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
