//! Warehouse support via DuckDB
//!
//! The warehouse is both the load target and the source of the watermarks
//! the fetch strategies resume from:
//! - `row_count` feeds the delta starting page
//! - `max_value` feeds the reverse-walk stop watermark
//! - `load` appends to a staging table and collapses duplicates into the
//!   destination table

mod engine;

pub use engine::{quote_ident, stage_table, DuckDbWarehouse};

use crate::error::Result;
use crate::resource::ResourceDescriptor;
use crate::types::RowSet;

/// Load target and watermark source
///
/// Implementations are blocking; async callers move calls onto a blocking
/// thread.
pub trait Warehouse: Send + Sync {
    /// Rows currently in `table` (0 when it does not exist)
    fn row_count(&self, table: &str) -> Result<u64>;

    /// Largest value of `column` in `table`, rendered as text
    ///
    /// `None` when the table or column is missing or holds no values.
    fn max_value(&self, table: &str, column: &str) -> Result<Option<String>>;

    /// Append `rows` and rebuild the deduplicated table; returns rows appended
    fn load(&self, descriptor: &ResourceDescriptor, rows: &RowSet) -> Result<u64>;
}
