//! YAML parser for connector definitions
//!
//! Resolves built-in names or file paths, then checks that the resource
//! registry is usable before any run touches the network.

use crate::connectors;
use crate::error::{Error, Result};
use crate::loader::types::ConnectorDefinition;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use url::Url;

/// Load a connector definition from a built-in name or a YAML file
///
/// A bare name without extension (e.g. `liaufa`) resolves to the embedded
/// definition; anything else is read from disk.
///
/// ```ignore
/// let connector = load_connector("liaufa")?;
/// let staging = load_connector("./staging.yaml")?;
/// ```
pub fn load_connector(source: impl AsRef<Path>) -> Result<ConnectorDefinition> {
    let source = source.as_ref();

    if let Some(yaml) = builtin_for(source) {
        return load_connector_from_str(yaml);
    }

    let content = fs::read_to_string(source).map_err(|e| read_error(source, &e))?;
    load_connector_from_str(&content)
}

fn builtin_for(source: &Path) -> Option<&'static str> {
    if source.components().count() != 1 || source.extension().is_some() {
        return None;
    }
    source.to_str().and_then(connectors::get_builtin)
}

fn read_error(source: &Path, e: &std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::NotFound {
        Error::config(format!(
            "Connector '{}' not found; built-in connectors: {}",
            source.display(),
            connectors::list_builtin().join(", ")
        ))
    } else {
        Error::config(format!("Failed to read '{}': {e}", source.display()))
    }
}

/// Load a connector definition from a YAML string
pub fn load_connector_from_str(yaml: &str) -> Result<ConnectorDefinition> {
    let def: ConnectorDefinition = serde_yaml::from_str(yaml)
        .map_err(|e| Error::config(format!("Failed to parse connector YAML: {e}")))?;

    validate_connector(&def)?;
    Ok(def)
}

/// Validate a connector definition
fn validate_connector(def: &ConnectorDefinition) -> Result<()> {
    if def.name.is_empty() {
        return Err(Error::config("Connector name cannot be empty"));
    }

    if def.base_url.is_empty() {
        return Err(Error::config("Connector base_url cannot be empty"));
    }
    Url::parse(&def.base_url)?;

    if def.http.concurrency == 0 {
        return Err(Error::config("http.concurrency must be greater than 0"));
    }

    if def.resources.is_empty() {
        return Err(Error::config("Connector must have at least one resource"));
    }

    let mut names = HashSet::new();
    for resource in &def.resources {
        if !names.insert(resource.name.as_str()) {
            return Err(Error::config(format!(
                "Duplicate resource name: {}",
                resource.name
            )));
        }
        resource.validate()?;
    }

    Ok(())
}
