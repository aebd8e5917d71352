//! Pagination module
//!
//! Supports: Sequential Forward, Sequential Reverse, Delta, Async Fan-out
//!
//! # Overview
//!
//! Every strategy walks a `page`/`page_size` collection end-to-end and
//! returns the complete row set. They share one page contract (see
//! `PageWalker`): 401 re-authenticates and retries the same page, 404 ends
//! the walk, anything else unexpected is fatal. Retries are always bounded.

mod strategies;
mod types;
mod walker;

pub use strategies::{
    build_fetcher, AsyncFanOut, Delta, FetchPlan, SequentialForward, SequentialReverse,
};
pub use types::{
    calls_needed, FanOutConfig, FetchStrategy, Fetcher, Page, PageQuery, RetryPolicy, Watermark,
    TIMESTAMP_FORMAT,
};
pub use walker::PageWalker;
