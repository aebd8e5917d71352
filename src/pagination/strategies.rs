//! Fetch strategy implementations
//!
//! Each strategy walks a collection in its own order. All loops are
//! iterative: a large resource never grows the call stack.

use super::types::{calls_needed, FanOutConfig, FetchStrategy, Fetcher, PageQuery, RetryPolicy, Watermark};
use super::walker::PageWalker;
use crate::error::{Error, Result};
use crate::http::Session;
use crate::resource::ResourceDescriptor;
use crate::types::RowSet;
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info, warn};

/// Walk forward from `start_page` until the collection runs out
async fn walk_forward(
    walker: &mut PageWalker<'_>,
    descriptor: &ResourceDescriptor,
    start_page: u32,
) -> Result<RowSet> {
    let mut rows = RowSet::new();
    let mut page = start_page;

    loop {
        let query = PageQuery::new(page, descriptor.page_size);
        let Some(result) = walker.fetch(&query).await? else {
            break;
        };

        // A 2xx without rows would otherwise be requested forever
        if result.results.is_empty() {
            debug!("{} page {} is empty, stopping", descriptor.endpoint, page);
            break;
        }

        debug!(
            "{} page {}: {} rows",
            descriptor.endpoint,
            page,
            result.results.len()
        );
        rows.extend(result.results);
        page += 1;
    }

    Ok(rows)
}

// ============================================================================
// Sequential Forward
// ============================================================================

/// Pages 1, 2, 3, ... in request order until a 404
///
/// O(pages) round trips; results come back in page order.
#[derive(Debug, Clone, Default)]
pub struct SequentialForward {
    policy: RetryPolicy,
}

impl SequentialForward {
    /// Create a forward walker; 502 is fatal on this path
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy: policy.with_gateway_retry(false),
        }
    }
}

#[async_trait]
impl Fetcher for SequentialForward {
    fn strategy(&self) -> FetchStrategy {
        FetchStrategy::Sequential
    }

    async fn fetch(&self, descriptor: &ResourceDescriptor, session: &Session) -> Result<RowSet> {
        let mut walker = PageWalker::start(session, &descriptor.endpoint, &self.policy).await?;
        walk_forward(&mut walker, descriptor, 1).await
    }
}

// ============================================================================
// Sequential Reverse
// ============================================================================

/// Walks from the last page downward until the watermark is crossed
///
/// Requests `ordering=<ordering_key>` so the newest rows sit on the highest
/// pages, then stops after the first page whose last row is older than the
/// watermark. Rows come back in walked (descending page) order.
#[derive(Debug, Clone)]
pub struct SequentialReverse {
    watermark: Watermark,
    policy: RetryPolicy,
}

impl SequentialReverse {
    /// Create a reverse walker bounded by `watermark`
    pub fn new(watermark: Watermark, policy: RetryPolicy) -> Self {
        Self {
            watermark,
            policy: policy.with_gateway_retry(false),
        }
    }

    /// The stop watermark
    pub fn watermark(&self) -> Watermark {
        self.watermark
    }
}

#[async_trait]
impl Fetcher for SequentialReverse {
    fn strategy(&self) -> FetchStrategy {
        FetchStrategy::Reverse
    }

    async fn fetch(&self, descriptor: &ResourceDescriptor, session: &Session) -> Result<RowSet> {
        let ordering_key = descriptor.ordering_key.as_deref().ok_or_else(|| {
            Error::config(format!(
                "Resource '{}' needs an ordering_key for the reverse strategy",
                descriptor.name
            ))
        })?;

        let mut walker = PageWalker::start(session, &descriptor.endpoint, &self.policy).await?;
        let count = walker.count().await?;
        let mut page = calls_needed(count, descriptor.page_size);

        info!(
            "{}: reverse walk from page {} down to watermark {}",
            descriptor.name, page, self.watermark
        );

        let mut rows = RowSet::new();
        while page >= 1 {
            let query = PageQuery::new(page, descriptor.page_size)
                .with_ordering(Some(ordering_key.to_string()));
            let Some(result) = walker.fetch(&query).await? else {
                break;
            };

            let last_value = result.results.last().map(|row| {
                row.get(ordering_key).and_then(Watermark::from_json)
            });
            rows.extend(result.results);

            match last_value {
                Some(Some(value)) if value < self.watermark => {
                    debug!(
                        "{} page {}: last {} {} is older than {}, stopping",
                        descriptor.endpoint, page, ordering_key, value, self.watermark
                    );
                    break;
                }
                Some(None) => warn!(
                    "{} page {}: last row has no comparable '{}' value, continuing",
                    descriptor.endpoint, page, ordering_key
                ),
                _ => {}
            }

            page -= 1;
        }

        Ok(rows)
    }
}

// ============================================================================
// Delta
// ============================================================================

/// Resumes forward from the page the store already covers
///
/// `starting_page = floor(stored_rows / page_size)`, clamped to the first
/// page. Overlap with rows already stored is expected; dedup happens
/// downstream. Only correct while page boundaries have not shifted.
#[derive(Debug, Clone, Default)]
pub struct Delta {
    stored_rows: u64,
    policy: RetryPolicy,
}

impl Delta {
    /// Create a delta walker for a store holding `stored_rows`
    pub fn new(stored_rows: u64, policy: RetryPolicy) -> Self {
        Self {
            stored_rows,
            policy: policy.with_gateway_retry(false),
        }
    }

    /// First page requested for a given page size
    pub fn starting_page(&self, page_size: u32) -> u32 {
        if page_size == 0 {
            return 1;
        }
        let page = self.stored_rows / u64::from(page_size);
        u32::try_from(page).unwrap_or(u32::MAX).max(1)
    }
}

#[async_trait]
impl Fetcher for Delta {
    fn strategy(&self) -> FetchStrategy {
        FetchStrategy::Delta
    }

    async fn fetch(&self, descriptor: &ResourceDescriptor, session: &Session) -> Result<RowSet> {
        let start = self.starting_page(descriptor.page_size);
        info!(
            "{}: {} rows stored, resuming at page {}",
            descriptor.name, self.stored_rows, start
        );

        let mut walker = PageWalker::start(session, &descriptor.endpoint, &self.policy).await?;
        walk_forward(&mut walker, descriptor, start).await
    }
}

// ============================================================================
// Async Fan-out
// ============================================================================

/// Requests every page concurrently and reassembles them in page order
///
/// At most `concurrency` requests are in flight. Each page owns a copy of
/// the initial token and retries its own 401s and 502s without touching
/// its siblings. The whole operation is bounded by `deadline`.
#[derive(Debug, Clone, Default)]
pub struct AsyncFanOut {
    config: FanOutConfig,
    policy: RetryPolicy,
}

impl AsyncFanOut {
    /// Create a fan-out fetcher; 502 is retried on this path
    pub fn new(config: FanOutConfig, policy: RetryPolicy) -> Self {
        Self {
            config,
            policy: policy.with_gateway_retry(true),
        }
    }

    async fn fan_out(&self, descriptor: &ResourceDescriptor, session: &Session) -> Result<RowSet> {
        let mut walker = PageWalker::start(session, &descriptor.endpoint, &self.policy).await?;
        let count = walker.count().await?;
        let calls = calls_needed(count, descriptor.page_size);

        info!(
            "{}: fanning out {} page requests ({} in flight)",
            descriptor.name, calls, self.config.concurrency
        );

        let token = walker.token().clone();
        let policy = &self.policy;

        // `buffered` yields in submission order, so pages come back ascending
        // no matter which request finishes first.
        let pages: Vec<RowSet> = stream::iter(1..=calls)
            .map(|page| {
                let query = PageQuery::new(page, descriptor.page_size)
                    .with_ordering(descriptor.ordering_key.clone());
                let mut page_walker =
                    PageWalker::with_token(session, &descriptor.endpoint, policy, token.clone());
                async move {
                    let result = page_walker.fetch(&query).await?;
                    Ok::<_, Error>(result.map(|p| p.results).unwrap_or_default())
                }
            })
            .buffered(self.config.concurrency.max(1))
            .try_collect()
            .await?;

        Ok(pages.into_iter().flatten().collect())
    }
}

#[async_trait]
impl Fetcher for AsyncFanOut {
    fn strategy(&self) -> FetchStrategy {
        FetchStrategy::Async
    }

    async fn fetch(&self, descriptor: &ResourceDescriptor, session: &Session) -> Result<RowSet> {
        tokio::time::timeout(self.config.deadline, self.fan_out(descriptor, session))
            .await
            .map_err(|_| Error::Timeout {
                timeout_ms: self.config.deadline.as_millis() as u64,
            })?
    }
}

// ============================================================================
// Selection
// ============================================================================

/// Inputs a strategy may need, resolved by the caller before the walk
#[derive(Debug, Clone)]
pub struct FetchPlan {
    /// Retry discipline per page
    pub policy: RetryPolicy,
    /// Fan-out limits
    pub fan_out: FanOutConfig,
    /// Reverse-walk stop watermark
    pub watermark: Watermark,
    /// Rows the store already holds
    pub stored_rows: u64,
}

impl Default for FetchPlan {
    fn default() -> Self {
        Self {
            policy: RetryPolicy::default(),
            fan_out: FanOutConfig::default(),
            watermark: Watermark::floor(),
            stored_rows: 0,
        }
    }
}

/// Build the fetcher for a strategy tag
pub fn build_fetcher(strategy: FetchStrategy, plan: &FetchPlan) -> Box<dyn Fetcher> {
    match strategy {
        FetchStrategy::Sequential => Box::new(SequentialForward::new(plan.policy.clone())),
        FetchStrategy::Reverse => {
            Box::new(SequentialReverse::new(plan.watermark, plan.policy.clone()))
        }
        FetchStrategy::Delta => Box::new(Delta::new(plan.stored_rows, plan.policy.clone())),
        FetchStrategy::Async => Box::new(AsyncFanOut::new(
            plan.fan_out.clone(),
            plan.policy.clone(),
        )),
    }
}
