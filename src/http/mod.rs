//! HTTP module
//!
//! Provides the scoped `Session` the fetch strategies walk pages with.
//!
//! # Features
//!
//! - **Connection pooling**: one `reqwest::Client` per session, shared by every page request
//! - **Rate Limiting**: optional token bucket rate limiter using governor
//! - **Status classification**: 401 / 404 / 502 are surfaced as outcomes, not errors
//! - **Authentication**: the session owns the run's credential manager

mod rate_limit;
mod session;

pub use rate_limit::{RateLimiter, RateLimiterConfig};
pub use session::{PageResponse, Session, SessionConfig, SessionConfigBuilder, DEFAULT_BASE_URL};
