//! CLI module
//!
//! Command-line interface for running resources.
//!
//! # Commands
//!
//! - `run <resource>` - Fetch one resource and load it into the warehouse
//! - `run-all` - Run every scheduled resource concurrently
//! - `list` - List the connector's resources
//! - `serve` - Start HTTP trigger mode

mod commands;
mod runner;
mod server;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
pub use server::{serve, ServerConfig};
