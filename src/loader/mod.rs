//! YAML Loader module
//!
//! Parse connector definitions from YAML files.
//!
//! # Overview
//!
//! The loader module provides:
//! - `ConnectorDefinition` - API location, HTTP limits and the resource registry
//! - `HttpDefinition` - timeouts, throttle and fan-out bounds
//! - YAML parsing with validation

mod parser;
mod types;

pub use parser::{load_connector, load_connector_from_str};
pub use types::{ConnectorDefinition, HttpDefinition};

#[cfg(test)]
mod tests;
