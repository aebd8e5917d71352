//! CLI commands and argument parsing

use crate::pagination::FetchStrategy;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Liaufa CRM to DuckDB sync
#[derive(Parser, Debug)]
#[command(name = "liaufa-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Connector definition: built-in name or YAML file
    #[arg(short, long, global = true, default_value = "liaufa")]
    pub connector: PathBuf,

    /// DuckDB warehouse file
    #[arg(short, long, global = true, env = "LIAUFA_WAREHOUSE", default_value = "liaufa.duckdb")]
    pub warehouse: PathBuf,

    /// Override the API base URL from the connector definition
    #[arg(long, global = true, env = "LIAUFA_BASE_URL")]
    pub base_url: Option<String>,

    /// API username
    #[arg(long, global = true, env = "LIAUFA_USERNAME")]
    pub username: Option<String>,

    /// API password
    #[arg(long, global = true, env = "LIAUFA_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Output format
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
    /// Fetch one resource and load it into the warehouse
    Run {
        /// Resource trigger name (e.g. Tags)
        resource: String,

        /// Override the resource's fetch strategy (sequential, reverse, delta, async)
        #[arg(long)]
        strategy: Option<FetchStrategy>,
    },

    /// Run every scheduled resource concurrently
    RunAll,

    /// List the connector's resources
    List,

    /// Start HTTP trigger server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
