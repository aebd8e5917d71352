//! Engine configuration
//!
//! Collects every tunable the run orchestrator needs: where the API lives,
//! how sessions are built, how logins and pages are retried and how wide
//! the async fan-out may go.

use crate::auth::AuthRetryConfig;
use crate::http::{RateLimiterConfig, SessionConfig};
use crate::loader::ConnectorDefinition;
use crate::pagination::{FanOutConfig, RetryPolicy};
use std::time::Duration;

/// Default application host sent as `h` on login
pub const DEFAULT_APP_HOST: &str = "https://app.aicorns.com";

/// Configuration for a `SyncEngine`
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Per-run HTTP session settings
    pub session: SessionConfig,
    /// Login retry budget
    pub auth_retry: AuthRetryConfig,
    /// Page retry discipline
    pub retry: RetryPolicy,
    /// Async fan-out bounds
    pub fan_out: FanOutConfig,
    /// Application host sent on login
    pub app_host: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            auth_retry: AuthRetryConfig::default(),
            retry: RetryPolicy::default(),
            fan_out: FanOutConfig::default(),
            app_host: DEFAULT_APP_HOST.to_string(),
        }
    }
}

impl EngineConfig {
    /// Create a new config builder
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Derive a config from a connector definition
    pub fn from_definition(definition: &ConnectorDefinition) -> Self {
        let http = &definition.http;

        let mut session = SessionConfig::builder()
            .base_url(&definition.base_url)
            .timeout(Duration::from_secs(http.timeout_seconds));
        if let Some(rps) = http.requests_per_second {
            session = session.rate_limit(RateLimiterConfig::per_second(rps));
        }
        if let Some(ref agent) = http.user_agent {
            session = session.user_agent(agent);
        }

        Self::builder()
            .session(session.build())
            .fan_out(FanOutConfig::new(
                http.concurrency,
                Duration::from_secs(http.deadline_seconds),
            ))
            .app_host(&definition.app_host)
            .build()
    }
}

/// Builder for engine config
#[derive(Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Set the session config
    pub fn session(mut self, session: SessionConfig) -> Self {
        self.config.session = session;
        self
    }

    /// Override only the API base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.session.base_url = url.into();
        self
    }

    /// Set the login retry budget
    pub fn auth_retry(mut self, auth_retry: AuthRetryConfig) -> Self {
        self.config.auth_retry = auth_retry;
        self
    }

    /// Set the page retry policy
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    /// Set the fan-out bounds
    pub fn fan_out(mut self, fan_out: FanOutConfig) -> Self {
        self.config.fan_out = fan_out;
        self
    }

    /// Set the application host
    pub fn app_host(mut self, host: impl Into<String>) -> Self {
        self.config.app_host = host.into();
        self
    }

    /// Build the config
    pub fn build(self) -> EngineConfig {
        self.config
    }
}
