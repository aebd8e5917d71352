//! Credential manager implementation
//!
//! Logs in against `POST {base}/token/?h=<app-host>` and hands out bearer tokens.

use super::types::{AuthRetryConfig, AuthToken, Credentials, TokenResponse, JSON_CONTENT_TYPE};
use crate::error::{Error, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

/// Outcome of a single login request
enum LoginOutcome {
    Token(AuthToken),
    RateLimited,
}

/// Obtains bearer tokens, retrying rate-limited logins
#[derive(Clone)]
pub struct CredentialManager {
    /// HTTP client for token requests
    http_client: Client,
    /// Full URL of the token endpoint
    token_url: String,
    /// Value of the `h` query parameter
    app_host: String,
    credentials: Credentials,
    retry: AuthRetryConfig,
}

impl CredentialManager {
    /// Create a credential manager with its own HTTP client
    pub fn new(
        base_url: &str,
        app_host: impl Into<String>,
        credentials: Credentials,
        retry: AuthRetryConfig,
    ) -> Self {
        Self::with_client(Client::new(), base_url, app_host, credentials, retry)
    }

    /// Create a credential manager sharing an existing HTTP client
    pub fn with_client(
        http_client: Client,
        base_url: &str,
        app_host: impl Into<String>,
        credentials: Credentials,
        retry: AuthRetryConfig,
    ) -> Self {
        Self {
            http_client,
            token_url: token_url(base_url),
            app_host: app_host.into(),
            credentials,
            retry,
        }
    }

    /// URL of the token endpoint
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Obtain a fresh token
    ///
    /// A 429 sleeps for the configured delay and tries again; once
    /// `max_attempts` logins in a row were rate limited the call fails with
    /// `AuthExhausted`. Any status other than 200/429 fails immediately with
    /// `AuthRejected`. Connection-level failures are retried on the same budget.
    pub async fn acquire(&self) -> Result<AuthToken> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.login().await {
                Ok(LoginOutcome::Token(token)) => {
                    debug!("Acquired token after {} attempt(s)", attempt);
                    return Ok(token);
                }
                Ok(LoginOutcome::RateLimited) => {
                    if attempt >= max_attempts {
                        return Err(Error::AuthExhausted { attempts: attempt });
                    }
                    warn!(
                        "Login rate limited (429), attempt {}/{}, waiting {:?}",
                        attempt, max_attempts, self.retry.delay
                    );
                }
                Err(Error::Http(e)) if (e.is_connect() || e.is_timeout()) && attempt < max_attempts => {
                    warn!(
                        "Login connection error, attempt {}/{}: {}",
                        attempt, max_attempts, e
                    );
                }
                Err(e) => return Err(e),
            }

            tokio::time::sleep(self.retry.delay).await;
        }
    }

    /// Send one login request
    async fn login(&self) -> Result<LoginOutcome> {
        let response = self
            .http_client
            .post(&self.token_url)
            .query(&[("h", self.app_host.as_str())])
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .json(&self.credentials)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let body: TokenResponse = response.json().await?;
                Ok(LoginOutcome::Token(AuthToken::new(body.access)))
            }
            StatusCode::TOO_MANY_REQUESTS => Ok(LoginOutcome::RateLimited),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(Error::AuthRejected {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}

impl std::fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialManager")
            .field("token_url", &self.token_url)
            .field("app_host", &self.app_host)
            .field("credentials", &self.credentials)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

/// Build the token endpoint URL from the API base
fn token_url(base_url: &str) -> String {
    format!("{}/token/", base_url.trim_end_matches('/'))
}
