//! CLI runner - executes commands

use crate::auth::Credentials;
use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::cli::server::{serve, ServerConfig};
use crate::config::EngineConfig;
use crate::engine::SyncEngine;
use crate::error::{Error, Result, ResultExt};
use crate::loader::{load_connector, ConnectorDefinition};
use crate::pagination::FetchStrategy;
use crate::types::OptionStringExt;
use crate::warehouse::DuckDbWarehouse;
use serde_json::{json, Value};
use std::sync::Arc;

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
            Commands::Run { resource, strategy } => self.run_resource(resource, *strategy).await,
            Commands::RunAll => self.run_all().await,
            Commands::List => self.list_resources(),
            Commands::Serve { port } => {
                let engine = self.build_engine()?;
                serve(
                    ServerConfig {
                        engine: Arc::new(engine),
                    },
                    *port,
                )
                .await
            }
        }
    }

    // ========================================================================
    // Engine Construction
    // ========================================================================

    fn load_definition(&self) -> Result<ConnectorDefinition> {
        load_connector(&self.cli.connector)
    }

    /// Config from the connector definition plus command-line overrides
    fn engine_config(&self, definition: &ConnectorDefinition) -> EngineConfig {
        let mut config = EngineConfig::from_definition(definition);
        if let Some(url) = self.cli.base_url.clone().none_if_empty() {
            config.session.base_url = url;
        }
        config
    }

    fn credentials(&self) -> Result<Credentials> {
        let username = self.cli.username.clone().none_if_empty().ok_or_else(|| {
            Error::config("Missing username: pass --username or set LIAUFA_USERNAME")
        })?;
        let password = self.cli.password.clone().none_if_empty().ok_or_else(|| {
            Error::config("Missing password: pass --password or set LIAUFA_PASSWORD")
        })?;
        Ok(Credentials::new(username, password))
    }

    /// Build a sync engine over the configured warehouse
    pub fn build_engine(&self) -> Result<SyncEngine> {
        let definition = self.load_definition()?;
        let config = self.engine_config(&definition);
        let credentials = self.credentials()?;
        let warehouse = DuckDbWarehouse::open(&self.cli.warehouse).with_context(|| {
            format!("Cannot use warehouse {}", self.cli.warehouse.display())
        })?;

        tracing::debug!(
            "Connector '{}' against {} into {}",
            definition.name,
            config.session.base_url,
            warehouse.location()
        );

        Ok(SyncEngine::new(
            definition,
            config,
            credentials,
            Arc::new(warehouse),
        ))
    }

    // ========================================================================
    // Commands
    // ========================================================================

    async fn run_resource(&self, name: &str, strategy: Option<FetchStrategy>) -> Result<()> {
        let engine = self.build_engine()?;
        let descriptor = engine.resource(name)?;

        let result = match strategy {
            Some(strategy) => engine.run_with_strategy(descriptor, strategy).await?,
            None => engine.run(descriptor).await?,
        };

        let mut msg = serde_json::to_value(&result)?;
        msg["type"] = json!("RESULT");
        msg["resource"] = json!(name);
        self.output_message(&msg);
        Ok(())
    }

    async fn run_all(&self) -> Result<()> {
        let engine = self.build_engine()?;
        let summary = engine.run_all().await;

        let mut msg = serde_json::to_value(&summary)?;
        msg["type"] = json!("SUMMARY");
        self.output_message(&msg);

        if summary.all_succeeded() {
            Ok(())
        } else {
            Err(Error::Other(format!(
                "{} of {} resources failed",
                summary.failed, summary.resources
            )))
        }
    }

    fn list_resources(&self) -> Result<()> {
        let definition = self.load_definition()?;

        let resources: Vec<Value> = definition
            .resources
            .iter()
            .map(|r| {
                json!({
                    "name": r.name,
                    "table": r.table,
                    "endpoint": r.endpoint,
                    "strategy": r.strategy.as_str(),
                    "page_size": r.page_size,
                    "scheduled": r.scheduled,
                })
            })
            .collect();

        self.output_message(&json!({
            "type": "RESOURCES",
            "connector": definition.name,
            "resources": resources,
        }));
        Ok(())
    }

    // ========================================================================
    // Output Helpers
    // ========================================================================

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
