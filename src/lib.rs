// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # liaufa-sync
//!
//! Paginated REST extraction engine for the Liaufa CRM API. Each resource is
//! fetched with one of four strategies, normalized against its declared
//! fields and loaded into a DuckDB warehouse with last-write-wins dedup.
//!
//! ## Features
//!
//! - **Scoped sessions**: one pooled HTTP client and one token per run
//! - **Bounded re-authentication**: a 401 refreshes the token and retries the same page
//! - **Four fetch strategies**: sequential, reverse-to-watermark, delta and async fan-out
//! - **Declarative resources**: a YAML registry of endpoints, keys and field types
//! - **Warehouse load**: staged append then collapse on the primary key
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use liaufa_sync::auth::Credentials;
//! use liaufa_sync::config::EngineConfig;
//! use liaufa_sync::warehouse::DuckDbWarehouse;
//! use liaufa_sync::{load_connector, Result, SyncEngine};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let definition = load_connector("liaufa")?;
//!     let config = EngineConfig::from_definition(&definition);
//!     let warehouse = Arc::new(DuckDbWarehouse::open("liaufa.duckdb")?);
//!
//!     let engine = SyncEngine::new(definition, config, Credentials::new("user", "pass"), warehouse);
//!     let result = engine.run_resource("Tags").await?;
//!     println!("{} rows into {}", result.num_processed, result.table);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 Trigger (CLI / HTTP server)                     │
//! │        run(resource)         run_all()         list()           │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────────────────────────┴──────────────────────────────────┐
//! │                     SyncEngine (per run)                        │
//! │     plan → Session::open → Fetcher → transform → Warehouse      │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬───────────┬─────────────┐
//! │   Auth   │   HTTP    │   Paginate    │ Resource  │  Warehouse  │
//! ├──────────┼───────────┼───────────────┼───────────┼─────────────┤
//! │ Login    │ Session   │ Sequential    │ Fields    │ DuckDB      │
//! │ 429 retry│ Rate Limit│ Reverse       │ Transform │ Stage       │
//! │ Reauth   │ Statuses  │ Delta         │ Registry  │ Dedup       │
//! │          │           │ Async fan-out │           │             │
//! └──────────┴───────────┴───────────────┴───────────┴─────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)] // TODO: Document error variant fields

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Credentials and token acquisition
pub mod auth;

/// Scoped HTTP session with rate limiting
pub mod http;

/// Page walking and fetch strategies
pub mod pagination;

/// Resource descriptors and row normalization
pub mod resource;

/// YAML loader for connector definitions
pub mod loader;

/// Built-in connector definitions
pub mod connectors;

/// DuckDB warehouse
pub mod warehouse;

/// Engine configuration
pub mod config;

/// Run orchestration
pub mod engine;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use engine::{FetchResult, RunSummary, SyncEngine};
pub use loader::{load_connector, load_connector_from_str, ConnectorDefinition};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
