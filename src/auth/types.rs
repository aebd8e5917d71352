//! Auth types
//!
//! Login credentials, the short-lived bearer token and the retry budget
//! applied to rate-limited logins.

use chrono::{DateTime, Utc};
use reqwest::header::AUTHORIZATION;
use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Content type sent with every request
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Username/password pair posted to the token endpoint
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    /// Account username
    pub username: String,
    /// Account password
    pub password: String,
}

impl Credentials {
    /// Create a new credential pair
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Bearer credential returned by a successful login
///
/// Never persisted. A token is only known to be stale once the server
/// rejects it, so callers holding a copy re-acquire on their own 401.
#[derive(Clone)]
pub struct AuthToken {
    access_token: String,
    issued_at: DateTime<Utc>,
}

impl AuthToken {
    /// Wrap an access token issued now
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            issued_at: Utc::now(),
        }
    }

    /// The raw access token
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// When the token was obtained
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Value of the `Authorization` header
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// Content-type headers sent alongside the token
    pub fn content_type_headers() -> [(&'static str, &'static str); 1] {
        [("Content-Type", JSON_CONTENT_TYPE)]
    }

    /// Apply the token headers to a request builder
    pub fn apply(&self, req: RequestBuilder) -> RequestBuilder {
        let mut req = req;
        for (key, value) in Self::content_type_headers() {
            req = req.header(key, value);
        }
        req.header(AUTHORIZATION, self.authorization_header())
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("access_token", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// Retry budget for rate-limited logins
#[derive(Debug, Clone)]
pub struct AuthRetryConfig {
    /// Total login attempts before giving up with `AuthExhausted`
    pub max_attempts: u32,
    /// Sleep between attempts
    pub delay: Duration,
}

impl Default for AuthRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(5),
        }
    }
}

impl AuthRetryConfig {
    /// Create a new retry config
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

/// Body of the token endpoint response
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access: String,
}
