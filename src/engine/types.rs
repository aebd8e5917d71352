//! Engine types
//!
//! Per-resource run results and the summary of a run-all.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Outcome of one successful resource run
///
/// `output_rows` is only present when something was fetched and loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResult {
    /// Destination table
    pub table: String,
    /// Rows returned by the fetch
    pub num_processed: u64,
    /// Rows appended by the load
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_rows: Option<u64>,
}

impl FetchResult {
    /// A run that fetched nothing and skipped the load
    pub fn empty(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            num_processed: 0,
            output_rows: None,
        }
    }

    /// A run that fetched and loaded rows
    pub fn loaded(table: impl Into<String>, num_processed: u64, output_rows: u64) -> Self {
        Self {
            table: table.into(),
            num_processed,
            output_rows: Some(output_rows),
        }
    }
}

/// One resource's entry in a run-all
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    /// Trigger name
    pub resource: String,
    /// Result when the run succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<FetchResult>,
    /// Error message when it failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunOutcome {
    /// Record a finished run
    pub fn from_result(resource: impl Into<String>, result: Result<FetchResult>) -> Self {
        let resource = resource.into();
        match result {
            Ok(result) => Self {
                resource,
                result: Some(result),
                error: None,
            },
            Err(e) => Self {
                resource,
                result: None,
                error: Some(e.to_string()),
            },
        }
    }

    /// Check if the run succeeded
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate of a run-all
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Resources started
    pub resources: usize,
    /// Resources that finished without error
    pub succeeded: usize,
    /// Resources that failed
    pub failed: usize,
    /// Rows fetched across successful runs
    pub rows_processed: u64,
    /// Wall-clock time of the whole run-all
    pub duration_ms: u64,
    /// Per-resource outcomes in registry order
    pub outcomes: Vec<RunOutcome>,
}

impl RunSummary {
    /// Tally outcomes
    pub fn from_outcomes(outcomes: Vec<RunOutcome>, duration_ms: u64) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let rows_processed = outcomes
            .iter()
            .filter_map(|o| o.result.as_ref())
            .map(|r| r.num_processed)
            .sum();

        Self {
            resources: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            rows_processed,
            duration_ms,
            outcomes,
        }
    }

    /// Check if every resource succeeded
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}
