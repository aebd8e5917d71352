//! Execution engine module
//!
//! Runs resources end to end.
//!
//! # Overview
//!
//! The engine module provides:
//! - `SyncEngine` - resolves a fetcher, fetches, transforms and loads
//! - `FetchResult` - per-resource outcome
//! - `RunSummary` - aggregate of a run-all
//!
//! A run opens its own `Session` and drops it before the load starts, on
//! success and error alike. Runs share nothing mutable, so `run_all` drives
//! every scheduled resource concurrently.

mod types;

pub use types::{FetchResult, RunOutcome, RunSummary};

use crate::auth::Credentials;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::http::Session;
use crate::loader::ConnectorDefinition;
use crate::pagination::{build_fetcher, FetchPlan, FetchStrategy, Watermark};
use crate::resource::{transform, ResourceDescriptor};
use crate::types::RowSet;
use crate::warehouse::Warehouse;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Run orchestrator for one connector
pub struct SyncEngine {
    definition: ConnectorDefinition,
    config: EngineConfig,
    credentials: Credentials,
    warehouse: Arc<dyn Warehouse>,
}

impl SyncEngine {
    /// Create a new sync engine
    pub fn new(
        definition: ConnectorDefinition,
        config: EngineConfig,
        credentials: Credentials,
        warehouse: Arc<dyn Warehouse>,
    ) -> Self {
        Self {
            definition,
            config,
            credentials,
            warehouse,
        }
    }

    /// The connector definition
    pub fn definition(&self) -> &ConnectorDefinition {
        &self.definition
    }

    /// The engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Look up a resource by trigger name
    pub fn resource(&self, name: &str) -> Result<&ResourceDescriptor> {
        self.definition
            .resource(name)
            .ok_or_else(|| Error::resource_not_found(name))
    }

    /// Run a resource by trigger name
    pub async fn run_resource(&self, name: &str) -> Result<FetchResult> {
        let descriptor = self.resource(name)?;
        self.run(descriptor).await
    }

    /// Run a resource with its configured strategy
    pub async fn run(&self, descriptor: &ResourceDescriptor) -> Result<FetchResult> {
        self.run_with_strategy(descriptor, descriptor.strategy).await
    }

    /// Run a resource with a one-off strategy
    pub async fn run_with_strategy(
        &self,
        descriptor: &ResourceDescriptor,
        strategy: FetchStrategy,
    ) -> Result<FetchResult> {
        let started = Instant::now();
        info!("{}: starting {} run", descriptor.name, strategy);

        let plan = self.plan(descriptor, strategy).await?;
        let rows = self.fetch(descriptor, strategy, &plan).await?;
        let num_processed = rows.len() as u64;

        if rows.is_empty() {
            info!("{}: nothing fetched, skipping load", descriptor.name);
            return Ok(FetchResult::empty(&descriptor.table));
        }

        let rows = transform(descriptor, rows)?;
        let output_rows = self.load(descriptor, rows).await?;

        info!(
            "{}: fetched {} rows, loaded {} into {} in {:?}",
            descriptor.name,
            num_processed,
            output_rows,
            descriptor.table,
            started.elapsed()
        );

        Ok(FetchResult::loaded(&descriptor.table, num_processed, output_rows))
    }

    /// Run every scheduled resource concurrently
    pub async fn run_all(&self) -> RunSummary {
        let started = Instant::now();
        let runs = self.definition.scheduled_resources().map(|descriptor| async move {
            let result = self.run(descriptor).await;
            if let Err(ref e) = result {
                let kind = if e.is_retryable() { "transient" } else { "fatal" };
                error!("{}: run failed ({}): {}", descriptor.name, kind, e);
            }
            RunOutcome::from_result(&descriptor.name, result)
        });

        let outcomes = join_all(runs).await;
        let summary = RunSummary::from_outcomes(outcomes, started.elapsed().as_millis() as u64);

        info!(
            "Run-all finished: {}/{} resources succeeded, {} rows",
            summary.succeeded, summary.resources, summary.rows_processed
        );
        summary
    }

    /// Resolve the warehouse-derived inputs a strategy needs
    async fn plan(&self, descriptor: &ResourceDescriptor, strategy: FetchStrategy) -> Result<FetchPlan> {
        let mut plan = FetchPlan {
            policy: self.config.retry.clone(),
            fan_out: self.config.fan_out.clone(),
            ..FetchPlan::default()
        };

        match strategy {
            FetchStrategy::Reverse => {
                let column = descriptor.ordering_key.clone().ok_or_else(|| {
                    Error::config(format!(
                        "Resource '{}' needs an ordering_key for the reverse strategy",
                        descriptor.name
                    ))
                })?;
                let table = descriptor.table.clone();
                let raw = self
                    .blocking(move |wh| wh.max_value(&table, &column))
                    .await?;
                plan.watermark = raw
                    .as_deref()
                    .and_then(Watermark::parse)
                    .unwrap_or_else(Watermark::floor);
                debug!("{}: watermark {}", descriptor.name, plan.watermark);
            }
            FetchStrategy::Delta => {
                let table = descriptor.table.clone();
                plan.stored_rows = self.blocking(move |wh| wh.row_count(&table)).await?;
                debug!("{}: {} rows stored", descriptor.name, plan.stored_rows);
            }
            FetchStrategy::Sequential | FetchStrategy::Async => {}
        }

        Ok(plan)
    }

    /// Fetch inside a session scoped to this call
    async fn fetch(
        &self,
        descriptor: &ResourceDescriptor,
        strategy: FetchStrategy,
        plan: &FetchPlan,
    ) -> Result<RowSet> {
        let session = Session::open(
            self.config.session.clone(),
            &self.config.app_host,
            self.credentials.clone(),
            self.config.auth_retry.clone(),
        )?;

        build_fetcher(strategy, plan).fetch(descriptor, &session).await
    }

    async fn load(&self, descriptor: &ResourceDescriptor, rows: RowSet) -> Result<u64> {
        let descriptor = descriptor.clone();
        self.blocking(move |wh| wh.load(&descriptor, &rows)).await
    }

    /// Run a warehouse call on the blocking pool
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn Warehouse) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let warehouse = Arc::clone(&self.warehouse);
        tokio::task::spawn_blocking(move || f(warehouse.as_ref()))
            .await
            .map_err(|e| Error::warehouse(format!("Warehouse task failed: {e}")))?
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("connector", &self.definition.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
