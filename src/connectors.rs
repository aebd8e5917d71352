//! Built-in connector definitions embedded in the binary
//!
//! Lets users pass `--connector liaufa` instead of a file path.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Built-in connector YAML definitions
pub static BUILTIN_CONNECTORS: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| {
        let mut m = HashMap::new();

        // CRM
        m.insert("liaufa", include_str!("../connectors/liaufa.yaml"));
        m.insert("aicorns", include_str!("../connectors/liaufa.yaml"));

        m
    });

/// Get a built-in connector by name
pub fn get_builtin(name: &str) -> Option<&'static str> {
    BUILTIN_CONNECTORS.get(name).copied()
}

/// Check if a connector name is a built-in connector
pub fn is_builtin(name: &str) -> bool {
    BUILTIN_CONNECTORS.contains_key(name)
}

/// List all built-in connector names (primary names only)
pub fn list_builtin() -> Vec<&'static str> {
    vec!["liaufa"]
}
