//! Shared page contract
//!
//! `PageWalker` fetches single pages on behalf of every strategy and applies
//! the status rules:
//! - 401: re-acquire a token and retry the same page, at most `max_reauth` times
//! - 404: no more pages, `Ok(None)`
//! - 502: backoff and retry when the policy allows it, fatal otherwise
//! - anything else: `UpstreamError`

use super::types::{Page, PageQuery, RetryPolicy};
use crate::auth::AuthToken;
use crate::error::{Error, Result};
use crate::http::{PageResponse, Session};
use tracing::{debug, warn};

/// Fetches pages of one endpoint with a token it refreshes on demand
pub struct PageWalker<'a> {
    session: &'a Session,
    endpoint: &'a str,
    policy: &'a RetryPolicy,
    token: AuthToken,
    reauth_count: u32,
}

impl<'a> PageWalker<'a> {
    /// Log in and start walking
    pub async fn start(
        session: &'a Session,
        endpoint: &'a str,
        policy: &'a RetryPolicy,
    ) -> Result<Self> {
        let token = session.acquire_token().await?;
        Ok(Self::with_token(session, endpoint, policy, token))
    }

    /// Start walking with a token obtained elsewhere (possibly already stale)
    pub fn with_token(
        session: &'a Session,
        endpoint: &'a str,
        policy: &'a RetryPolicy,
        token: AuthToken,
    ) -> Self {
        Self {
            session,
            endpoint,
            policy,
            token,
            reauth_count: 0,
        }
    }

    /// The token currently held
    pub fn token(&self) -> &AuthToken {
        &self.token
    }

    /// Re-authentications performed so far
    pub fn reauth_count(&self) -> u32 {
        self.reauth_count
    }

    /// Fetch one page; `None` means the page does not exist (404)
    pub async fn fetch(&mut self, query: &PageQuery) -> Result<Option<Page>> {
        let mut reauths = 0;
        let mut gateway_retries = 0;

        loop {
            match self.session.get_page(self.endpoint, query, &self.token).await? {
                PageResponse::Page(page) => return Ok(Some(page)),
                PageResponse::NotFound => {
                    debug!("{} page {} not found, end of collection", self.endpoint, query.page);
                    return Ok(None);
                }
                PageResponse::Unauthorized => {
                    if reauths >= self.policy.max_reauth {
                        return Err(Error::upstream(
                            401,
                            format!(
                                "token rejected for {} page {} after {reauths} re-authentication(s)",
                                self.endpoint, query.page
                            ),
                        ));
                    }
                    reauths += 1;
                    self.reauth_count += 1;
                    warn!(
                        "{} page {}: token expired (401), re-authenticating",
                        self.endpoint, query.page
                    );
                    self.token = self.session.acquire_token().await?;
                }
                PageResponse::BadGateway
                    if self.policy.retry_gateway
                        && gateway_retries < self.policy.max_gateway_retries =>
                {
                    let delay = self.policy.backoff(gateway_retries);
                    gateway_retries += 1;
                    warn!(
                        "{} page {}: bad gateway (502), attempt {}/{}, retrying in {:?}",
                        self.endpoint,
                        query.page,
                        gateway_retries,
                        self.policy.max_gateway_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                PageResponse::BadGateway => {
                    return Err(Error::upstream(502, "bad gateway"));
                }
                PageResponse::Status { status, body } => {
                    return Err(Error::upstream(status, body));
                }
            }
        }
    }

    /// Read the collection's total row count (a 404 counts as empty)
    pub async fn count(&mut self) -> Result<u64> {
        let count = self
            .fetch(&PageQuery::count_probe())
            .await?
            .map_or(0, |page| page.count);
        debug!("{} reports {} rows", self.endpoint, count);
        Ok(count)
    }
}
