//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{ConnectorConfig, RunConfig};
use crate::destination::{Destination, JsonLinesDestination};
use crate::engine::{EntityPlan, SyncOrchestrator};
use crate::error::{Error, Result};
use crate::fetch::FetchWindow;
use crate::source::{HttpPageSource, PageSource};
use crate::state::{CheckpointStore, FileCheckpointStore, SyncState};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Sync { entities, output } => self.sync(entities, output.as_deref()).await,
            Commands::Check => self.check().await,
            Commands::State => self.state().await,
            Commands::Reset { entity } => self.reset(entity.as_deref()).await,
            Commands::Validate => self.validate(),
        }
    }

    /// Load connector definition
    fn load_connector(&self) -> Result<ConnectorConfig> {
        let path = self
            .cli
            .connector
            .as_ref()
            .ok_or_else(|| Error::config("Connector file not specified (use -c flag)"))?;
        ConnectorConfig::from_file(path)
    }

    /// Load run configuration
    fn load_run_config(&self) -> Result<RunConfig> {
        // Inline config takes precedence
        if let Some(json_str) = &self.cli.config_json {
            return RunConfig::from_json(json_str);
        }

        if let Some(path) = &self.cli.config {
            let content = fs::read_to_string(path)
                .map_err(|e| Error::config(format!("Failed to read config file: {e}")))?;
            return RunConfig::from_json(&content);
        }

        Ok(RunConfig::default())
    }

    fn store(&self) -> FileCheckpointStore {
        FileCheckpointStore::new(&self.cli.state)
    }

    /// Sync selected entities
    async fn sync(&self, entities: &[String], output: Option<&Path>) -> Result<()> {
        let connector = self.load_connector()?;
        let run_config = self.load_run_config()?;

        let selection = (!entities.is_empty()).then_some(entities);
        let plans: Vec<EntityPlan> = connector
            .select_entities(selection)?
            .into_iter()
            .map(EntityPlan::from_config)
            .collect();

        let destination: Arc<dyn Destination> = match output {
            Some(path) => Arc::new(JsonLinesDestination::append(path).await?),
            None => Arc::new(JsonLinesDestination::stdout()),
        };
        let source = Arc::new(HttpPageSource::from_config(&connector, &run_config)?);
        let orchestrator = SyncOrchestrator::new(
            source,
            destination,
            Arc::new(self.store()),
            connector.sync.clone(),
        );

        info!(
            "Syncing {} entities of {} (state: {})",
            plans.len(),
            connector.name,
            self.cli.state.display()
        );
        let report = orchestrator.run(&plans, &run_config).await?;

        // Rows own stdout unless they go to a file
        let message = json!({"type": "REPORT", "report": report});
        if output.is_some() {
            self.output_message(&message);
        } else {
            info!("{message}");
        }
        Ok(())
    }

    /// Check connection for every entity
    async fn check(&self) -> Result<()> {
        let connector = self.load_connector()?;
        let run_config = self.load_run_config()?;
        let source = HttpPageSource::from_config(&connector, &run_config)?;

        for entity in &connector.entities {
            let window = FetchWindow::new(&entity.name, 1);
            let status = match source.query_page(&window).await {
                Ok(page) => json!({
                    "status": "SUCCEEDED",
                    "message": format!("Fetched {} record(s)", page.records.len())
                }),
                Err(e) => json!({
                    "status": "FAILED",
                    "message": format!("Connection failed: {e}")
                }),
            };
            self.output_message(&json!({
                "type": "CONNECTION_STATUS",
                "entity": entity.name,
                "connectionStatus": status
            }));
        }

        Ok(())
    }

    /// Print persisted state
    async fn state(&self) -> Result<()> {
        let state = self.store().load().await?;
        self.output_message(&json!({"type": "STATE", "state": state}));
        Ok(())
    }

    /// Clear persisted state
    async fn reset(&self, entity: Option<&str>) -> Result<()> {
        let store = self.store();
        let state = match entity {
            Some(name) => {
                let mut state = store.load().await?;
                state.clear_entity(name);
                state
            }
            None => SyncState::new(),
        };
        store.checkpoint(&state).await?;

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": match entity {
                    Some(name) => format!("Reset state for {name}"),
                    None => "Reset all state".to_string(),
                }
            }
        }));
        Ok(())
    }

    /// Validate connector definition
    fn validate(&self) -> Result<()> {
        let connector = self.load_connector()?;
        let entities: Vec<&str> = connector.entities.iter().map(|e| e.name.as_str()).collect();
        self.output_message(&json!({
            "type": "VALIDATION",
            "valid": true,
            "connector": connector.name,
            "entities": entities
        }));
        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}
