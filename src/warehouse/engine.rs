//! DuckDB-backed warehouse
//!
//! Every resource owns two tables: `_stage_<table>` receives each run's rows
//! append-only, and `<table>` is rebuilt from it keeping one row per primary
//! key (the newest by `increment_key` when one is declared).

use super::Warehouse;
use crate::error::{Error, Result};
use crate::resource::{parse_timestamp, FieldType, ResourceDescriptor};
use crate::types::{JsonValue, RowSet};
use duckdb::{params, params_from_iter, Connection};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Naive UTC rendering bound into TIMESTAMP columns
const WAREHOUSE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Quote a SQL identifier
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Name of the append-only staging table behind `table`
pub fn stage_table(table: &str) -> String {
    format!("_stage_{table}")
}

/// One destination column
#[derive(Debug, Clone, PartialEq)]
struct Column {
    name: String,
    field_type: Option<FieldType>,
}

impl Column {
    fn sql_type(&self) -> &'static str {
        self.field_type.map_or("VARCHAR", |t| t.sql_type())
    }

    /// Render a row value as the text bound into `CAST(? AS <type>)`
    fn bind_value(&self, value: Option<&JsonValue>) -> Result<Option<String>> {
        let Some(value) = value.filter(|v| !v.is_null()) else {
            return Ok(None);
        };

        let text = match (self.field_type, value) {
            (Some(FieldType::Timestamp), JsonValue::String(s)) => parse_timestamp(s)
                .map(|ts| ts.format(WAREHOUSE_TIMESTAMP_FORMAT).to_string())
                .ok_or_else(|| Error::transform(self.name.clone(), format!("not a timestamp: {s}")))?,
            (_, JsonValue::String(s)) => s.clone(),
            (_, other) => other.to_string(),
        };

        Ok(Some(text))
    }
}

/// Warehouse stored in a DuckDB database file (or in memory)
pub struct DuckDbWarehouse {
    conn: Mutex<Connection>,
    location: String,
}

impl DuckDbWarehouse {
    /// Open (or create) a database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| {
            Error::warehouse(format!(
                "Failed to open DuckDB database '{}': {e}",
                path.display()
            ))
        })?;

        info!("Opened warehouse at {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
            location: path.display().to_string(),
        })
    }

    /// Open a throwaway in-memory database
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::warehouse(format!("Failed to create DuckDB connection: {e}")))?;

        Ok(Self {
            conn: Mutex::new(conn),
            location: ":memory:".to_string(),
        })
    }

    /// Where the database lives
    pub fn location(&self) -> &str {
        &self.location
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::warehouse("DuckDB connection lock poisoned"))
    }

    fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
        let count: i64 = conn.query_row(
            "SELECT count(*) FROM information_schema.tables WHERE table_name = ?",
            params![table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool> {
        let count: i64 = conn.query_row(
            "SELECT count(*) FROM information_schema.columns WHERE table_name = ? AND column_name = ?",
            params![table, column],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Destination columns: declared fields, or every key seen in `rows`
    fn columns(descriptor: &ResourceDescriptor, rows: &RowSet) -> Vec<Column> {
        if descriptor.fields.is_empty() {
            let keys: BTreeSet<&String> = rows.iter().flat_map(|row| row.keys()).collect();
            return keys
                .into_iter()
                .map(|name| Column {
                    name: name.clone(),
                    field_type: None,
                })
                .collect();
        }

        descriptor
            .fields
            .iter()
            .map(|f| Column {
                name: f.name.clone(),
                field_type: Some(f.field_type),
            })
            .collect()
    }

    fn ensure_stage(conn: &Connection, stage: &str, columns: &[Column]) -> Result<()> {
        let definitions: Vec<String> = columns
            .iter()
            .map(|c| format!("{} {}", quote_ident(&c.name), c.sql_type()))
            .collect();

        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} ({});",
            quote_ident(stage),
            definitions.join(", ")
        ))?;

        // Columns first seen after the table was created
        for column in columns {
            conn.execute_batch(&format!(
                "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} {};",
                quote_ident(stage),
                quote_ident(&column.name),
                column.sql_type()
            ))?;
        }

        Ok(())
    }

    fn collapse_sql(descriptor: &ResourceDescriptor) -> String {
        let partition: Vec<String> = descriptor.primary_key.iter().map(|k| quote_ident(k)).collect();
        let order = descriptor
            .increment_key
            .as_deref()
            .map(|k| format!(" ORDER BY {} DESC", quote_ident(k)))
            .unwrap_or_default();

        format!(
            "CREATE OR REPLACE TABLE {table} AS \
             SELECT * EXCLUDE (row_num) FROM ( \
                 SELECT *, ROW_NUMBER() OVER (PARTITION BY {partition}{order}) AS row_num \
                 FROM {stage} \
             ) WHERE row_num = 1",
            table = quote_ident(&descriptor.table),
            stage = quote_ident(&stage_table(&descriptor.table)),
            partition = partition.join(", "),
        )
    }
}

impl Warehouse for DuckDbWarehouse {
    fn row_count(&self, table: &str) -> Result<u64> {
        let conn = self.lock()?;
        if !Self::table_exists(&conn, table)? {
            return Ok(0);
        }

        let count: i64 = conn.query_row(
            &format!("SELECT count(*) FROM {}", quote_ident(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    fn max_value(&self, table: &str, column: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        if !Self::table_exists(&conn, table)? || !Self::column_exists(&conn, table, column)? {
            return Ok(None);
        }

        let value: Option<String> = conn.query_row(
            &format!(
                "SELECT CAST(MAX({}) AS VARCHAR) FROM {}",
                quote_ident(column),
                quote_ident(table)
            ),
            [],
            |row| row.get(0),
        )?;
        Ok(value)
    }

    fn load(&self, descriptor: &ResourceDescriptor, rows: &RowSet) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let columns = Self::columns(descriptor, rows);
        if columns.is_empty() {
            return Err(Error::warehouse(format!(
                "No columns to load for '{}'",
                descriptor.table
            )));
        }

        let stage = stage_table(&descriptor.table);
        let mut conn = self.lock()?;
        Self::ensure_stage(&conn, &stage, &columns)?;

        let insert = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(&stage),
            columns
                .iter()
                .map(|c| quote_ident(&c.name))
                .collect::<Vec<_>>()
                .join(", "),
            columns
                .iter()
                .map(|c| format!("CAST(? AS {})", c.sql_type()))
                .collect::<Vec<_>>()
                .join(", ")
        );

        let tx = conn.transaction()?;
        let mut appended = 0u64;
        {
            let mut stmt = tx.prepare(&insert)?;
            for row in rows {
                let values = columns
                    .iter()
                    .map(|c| c.bind_value(row.get(&c.name)))
                    .collect::<Result<Vec<_>>>()?;
                appended += stmt.execute(params_from_iter(values))? as u64;
            }
        }
        tx.execute_batch(&Self::collapse_sql(descriptor))?;
        tx.commit()?;

        debug!(
            "Appended {} rows to {} and rebuilt {}",
            appended, stage, descriptor.table
        );

        Ok(appended)
    }
}

impl std::fmt::Debug for DuckDbWarehouse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDbWarehouse")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod engine_tests {
    use super::*;
    use crate::resource::FieldDef;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("tags"), "\"tags\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_collapse_sql_with_increment_key() {
        let d = ResourceDescriptor::new("M", "messenger", "m/", 10).with_increment_key("updated");
        let sql = DuckDbWarehouse::collapse_sql(&d);
        assert!(sql.contains("PARTITION BY \"id\" ORDER BY \"updated\" DESC"));
        assert!(sql.contains("FROM \"_stage_messenger\""));
    }

    #[test]
    fn test_collapse_sql_without_increment_key() {
        let d = ResourceDescriptor::new("T", "tags", "t/", 10).with_primary_key(["a", "b"]);
        let sql = DuckDbWarehouse::collapse_sql(&d);
        assert!(sql.contains("PARTITION BY \"a\", \"b\") AS row_num"));
    }

    #[test]
    fn test_bind_timestamp_as_naive_utc() {
        let column = Column {
            name: "updated".to_string(),
            field_type: Some(FieldType::Timestamp),
        };
        let value = JsonValue::String("2024-03-01T10:15:30+02:00".to_string());
        assert_eq!(
            column.bind_value(Some(&value)).unwrap().as_deref(),
            Some("2024-03-01 08:15:30")
        );
        assert_eq!(column.bind_value(Some(&JsonValue::Null)).unwrap(), None);
        assert_eq!(column.bind_value(None).unwrap(), None);
    }

    #[test]
    fn test_columns_follow_fields() {
        let d = ResourceDescriptor::new("T", "tags", "t/", 10)
            .with_fields(vec![FieldDef::new("id", FieldType::Integer)]);
        let columns = DuckDbWarehouse::columns(&d, &RowSet::new());
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].sql_type(), "BIGINT");
    }
}
