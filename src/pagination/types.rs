//! Pagination types and traits
//!
//! Defines the core pagination abstractions used by all strategies.

use crate::error::Result;
use crate::http::Session;
use crate::resource::ResourceDescriptor;
use crate::types::{BackoffType, JsonValue, Row, RowSet};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;

/// Timestamp format used by the upstream API
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// One server response: `{count, results}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Total rows in the collection
    #[serde(default)]
    pub count: u64,
    /// Rows on this page, every field preserved
    #[serde(default)]
    pub results: Vec<Row>,
}

/// Query parameters of a list request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    /// 1-based page number
    pub page: u32,
    /// Rows per page
    pub page_size: u32,
    /// Optional `ordering` field
    pub ordering: Option<String>,
}

impl PageQuery {
    /// Create a query for a page
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size,
            ordering: None,
        }
    }

    /// The cheap probe used to read `count`: page 1, one row
    pub fn count_probe() -> Self {
        Self::new(1, 1)
    }

    /// Set the ordering field
    #[must_use]
    pub fn with_ordering(mut self, ordering: Option<String>) -> Self {
        self.ordering = ordering;
        self
    }

    /// Render as query string pairs
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("page", self.page.to_string()),
            ("page_size", self.page_size.to_string()),
        ];
        if let Some(ordering) = &self.ordering {
            params.push(("ordering", ordering.clone()));
        }
        params
    }
}

/// Number of pages needed to cover `count` rows
pub fn calls_needed(count: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    u32::try_from(count.div_ceil(u64::from(page_size))).unwrap_or(u32::MAX)
}

/// Bounded retry discipline for a single page request
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Re-authentications allowed per page before a 401 becomes fatal
    pub max_reauth: u32,
    /// Whether 502 is retried (async path) or fatal (sequential paths)
    pub retry_gateway: bool,
    /// Gateway retries allowed per page
    pub max_gateway_retries: u32,
    /// Type of backoff strategy
    pub backoff_type: BackoffType,
    /// Initial delay for backoff
    pub initial_backoff: Duration,
    /// Maximum delay for backoff
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_reauth: 3,
            retry_gateway: false,
            max_gateway_retries: 5,
            backoff_type: BackoffType::Exponential,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Set whether 502 responses are retried
    #[must_use]
    pub fn with_gateway_retry(mut self, retry: bool) -> Self {
        self.retry_gateway = retry;
        self
    }

    /// Set backoff configuration
    #[must_use]
    pub fn with_backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.backoff_type = backoff_type;
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Calculate backoff delay for a given attempt
    pub fn backoff(&self, attempt: u32) -> Duration {
        let delay = match self.backoff_type {
            BackoffType::Constant => self.initial_backoff,
            BackoffType::Linear => self.initial_backoff.saturating_mul(attempt + 1),
            BackoffType::Exponential => {
                let factor = 2u32.saturating_pow(attempt);
                self.initial_backoff.saturating_mul(factor)
            }
        };

        std::cmp::min(delay, self.max_backoff)
    }
}

/// Limits for the async fan-out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOutConfig {
    /// Page requests in flight at once
    pub concurrency: usize,
    /// Wall-clock bound on the whole fan-out
    pub deadline: Duration,
}

impl Default for FanOutConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            deadline: Duration::from_secs(3600),
        }
    }
}

impl FanOutConfig {
    /// Create a fan-out config
    pub fn new(concurrency: usize, deadline: Duration) -> Self {
        Self {
            concurrency,
            deadline,
        }
    }
}

/// Comparable value of an ordering key
///
/// Values of different kinds never compare, so a walk cannot be cut
/// short by comparing a timestamp against an integer id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Watermark {
    /// Point in time
    Timestamp(DateTime<Utc>),
    /// Integer key (e.g. an id)
    Integer(i64),
}

impl Watermark {
    /// Floor used when the store holds nothing yet
    pub fn floor() -> Self {
        // Default is 1970-01-01T00:00:00Z
        Self::Timestamp(DateTime::<Utc>::default())
    }

    /// Parse a stored or upstream ordering value
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if let Ok(n) = raw.parse::<i64>() {
            return Some(Self::Integer(n));
        }

        if let Ok(dt) = DateTime::parse_from_str(raw, TIMESTAMP_FORMAT) {
            return Some(Self::Timestamp(dt.with_timezone(&Utc)));
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(Self::Timestamp(dt.with_timezone(&Utc)));
        }

        // Warehouse TIMESTAMP columns come back without an offset and are UTC
        ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| Self::Timestamp(Utc.from_utc_datetime(&naive)))
    }

    /// Read an ordering value out of a row field
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::Number(n) => n.as_i64().map(Self::Integer),
            JsonValue::String(s) => Self::parse(s),
            _ => None,
        }
    }
}

impl PartialOrd for Watermark {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Timestamp(a), Self::Timestamp(b)) => a.partial_cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Self::Integer(n) => write!(f, "{n}"),
        }
    }
}

/// Which algorithm walks a resource; a static per-resource choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStrategy {
    /// Pages 1, 2, 3, ... until 404
    #[default]
    Sequential,
    /// From the last page downward until the watermark is crossed
    Reverse,
    /// Forward from the page the store already covers
    Delta,
    /// Every page concurrently, reassembled in page order
    Async,
}

impl FetchStrategy {
    /// Stable lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Reverse => "reverse",
            Self::Delta => "delta",
            Self::Async => "async",
        }
    }
}

impl fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FetchStrategy {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" | "simple" | "forward" => Ok(Self::Sequential),
            "reverse" => Ok(Self::Reverse),
            "delta" => Ok(Self::Delta),
            "async" | "fan_out" | "fanout" => Ok(Self::Async),
            other => Err(crate::error::Error::config(format!(
                "Unknown fetch strategy: {other}"
            ))),
        }
    }
}

/// Core trait for fetch strategies
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Strategy implemented by this fetcher
    fn strategy(&self) -> FetchStrategy;

    /// Walk the collection end-to-end and return every row
    async fn fetch(&self, descriptor: &ResourceDescriptor, session: &Session) -> Result<RowSet>;
}
