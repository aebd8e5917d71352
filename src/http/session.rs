//! Scoped HTTP session
//!
//! A `Session` is opened once per resource run and dropped when the run
//! ends, on success and error alike. It owns:
//! - one pooled `reqwest::Client` shared by every page request
//! - an optional client-side rate limiter
//! - the credential manager used to (re-)authenticate

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::auth::{AuthRetryConfig, AuthToken, CredentialManager, Credentials};
use crate::error::Result;
use crate::pagination::{Page, PageQuery};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

/// Default upstream API base
pub const DEFAULT_BASE_URL: &str = "https://api.liaufa.com/api/v1";

/// Configuration for a session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base URL for all requests
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Rate limiter configuration
    pub rate_limit: Option<RateLimiterConfig>,
    /// Idle connections kept per host (bounds the pool)
    pub max_idle_per_host: usize,
    /// User agent string
    pub user_agent: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            rate_limit: None,
            max_idle_per_host: 10,
            user_agent: format!("liaufa-sync/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl SessionConfig {
    /// Create a new config builder
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }
}

/// Builder for session config
#[derive(Default)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set rate limiter
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Disable rate limiting
    pub fn no_rate_limit(mut self) -> Self {
        self.config.rate_limit = None;
        self
    }

    /// Set the idle pool size per host
    pub fn max_idle_per_host(mut self, max: usize) -> Self {
        self.config.max_idle_per_host = max;
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> SessionConfig {
        self.config
    }
}

/// Classified response to a page request
#[derive(Debug, Clone)]
pub enum PageResponse {
    /// 2xx with a decoded page
    Page(Page),
    /// 401: the token is expired or invalid
    Unauthorized,
    /// 404: the page is beyond the collection
    NotFound,
    /// 502: transient gateway fault
    BadGateway,
    /// Any other status
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },
}

/// Reusable HTTP-connection resource for one run
pub struct Session {
    client: Client,
    config: SessionConfig,
    rate_limiter: Option<RateLimiter>,
    credentials: CredentialManager,
}

impl Session {
    /// Open a session
    pub fn open(
        config: SessionConfig,
        app_host: impl Into<String>,
        credentials: Credentials,
        auth_retry: AuthRetryConfig,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(config.max_idle_per_host)
            .user_agent(&config.user_agent)
            .build()?;

        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);
        let credentials = CredentialManager::with_client(
            client.clone(),
            &config.base_url,
            app_host,
            credentials,
            auth_retry,
        );

        debug!("Opened session against {}", config.base_url);

        Ok(Self {
            client,
            config,
            rate_limiter,
            credentials,
        })
    }

    /// The session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The credential manager bound to this session
    pub fn credentials(&self) -> &CredentialManager {
        &self.credentials
    }

    /// Check if rate limiting is enabled
    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }

    /// Log in and return a fresh token
    pub async fn acquire_token(&self) -> Result<AuthToken> {
        self.credentials.acquire().await
    }

    /// Full URL of a list endpoint
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let endpoint = endpoint.trim_start_matches('/');
        format!("{base}/{endpoint}")
    }

    /// Request one page and classify the response
    ///
    /// Transport failures are returned as errors; every HTTP status is
    /// returned as a `PageResponse` for the caller to act on.
    pub async fn get_page(
        &self,
        endpoint: &str,
        query: &PageQuery,
        token: &AuthToken,
    ) -> Result<PageResponse> {
        if let Some(ref limiter) = self.rate_limiter {
            limiter.wait().await;
        }

        let url = self.endpoint_url(endpoint);
        let req = token.apply(self.client.get(&url).query(&query.to_params()));
        let response = req.send().await?;
        let status = response.status();

        debug!("GET {} page={} -> {}", url, query.page, status.as_u16());

        let outcome = match status {
            s if s.is_success() => {
                let body = response.text().await?;
                PageResponse::Page(serde_json::from_str(&body)?)
            }
            StatusCode::UNAUTHORIZED => PageResponse::Unauthorized,
            StatusCode::NOT_FOUND => PageResponse::NotFound,
            StatusCode::BAD_GATEWAY => PageResponse::BadGateway,
            s => PageResponse::Status {
                status: s.as_u16(),
                body: response.text().await.unwrap_or_default(),
            },
        };

        Ok(outcome)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}
