//! Loader types
//!
//! Declarative connector definition types for YAML parsing.

use crate::config::DEFAULT_APP_HOST;
use crate::resource::ResourceDescriptor;
use serde::{Deserialize, Serialize};

// ============================================================================
// Connector Definition
// ============================================================================

/// Top-level connector definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConnectorDefinition {
    /// Connector name
    pub name: String,
    /// API base URL for all requests
    pub base_url: String,
    /// Application host sent as `h` on login
    #[serde(default = "default_app_host")]
    pub app_host: String,
    /// HTTP client configuration
    #[serde(default)]
    pub http: HttpDefinition,
    /// Resource registry
    pub resources: Vec<ResourceDescriptor>,
}

impl ConnectorDefinition {
    /// Look up a resource by trigger name
    pub fn resource(&self, name: &str) -> Option<&ResourceDescriptor> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// Trigger names in registry order
    pub fn resource_names(&self) -> Vec<&str> {
        self.resources.iter().map(|r| r.name.as_str()).collect()
    }

    /// Resources included in a run-all
    pub fn scheduled_resources(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.resources.iter().filter(|r| r.scheduled)
    }
}

fn default_app_host() -> String {
    DEFAULT_APP_HOST.to_string()
}

// ============================================================================
// HTTP Definition
// ============================================================================

/// HTTP client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HttpDefinition {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Client-side throttle (requests per second)
    #[serde(default)]
    pub requests_per_second: Option<u32>,
    /// Page requests in flight during a fan-out
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Wall-clock bound on a fan-out, in seconds
    #[serde(default = "default_deadline")]
    pub deadline_seconds: u64,
    /// User agent
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for HttpDefinition {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            requests_per_second: None,
            concurrency: default_concurrency(),
            deadline_seconds: default_deadline(),
            user_agent: None,
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_concurrency() -> usize {
    10
}

fn default_deadline() -> u64 {
    3600
}
