//! Resource descriptor types
//!
//! A `ResourceDescriptor` is immutable configuration: one per upstream
//! collection, shared by every run of that resource.

use crate::error::{Error, Result};
use crate::pagination::FetchStrategy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Declared type of a resource field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// 64-bit integer
    Integer,
    /// UTF-8 text
    String,
    /// true/false
    Boolean,
    /// Instant with offset, normalized to UTC
    Timestamp,
    /// Calendar date
    Date,
    /// Nested object restricted to its declared sub-fields
    Record,
    /// Arbitrary JSON stored as text
    Json,
}

impl FieldType {
    /// Warehouse column type for this field
    pub fn sql_type(&self) -> &'static str {
        match self {
            Self::Integer => "BIGINT",
            Self::Boolean => "BOOLEAN",
            Self::Timestamp => "TIMESTAMP",
            Self::Date => "DATE",
            Self::String | Self::Record | Self::Json => "VARCHAR",
        }
    }
}

/// One declared field of a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name in the upstream payload and the warehouse column
    pub name: String,
    /// Declared type
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Sub-fields of a `record`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldDef>,
}

impl FieldDef {
    /// Create a scalar field
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            fields: Vec::new(),
        }
    }

    /// Create a record field with sub-fields
    pub fn record(name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Record,
            fields,
        }
    }
}

/// Static description of one upstream collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// Trigger name (e.g. `Tags`)
    pub name: String,
    /// Destination warehouse table
    pub table: String,
    /// Relative list path (e.g. `linkedin/accounts/`)
    pub endpoint: String,
    /// Rows requested per page
    pub page_size: u32,
    /// Field the server sorts by; sent as `ordering`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordering_key: Option<String>,
    /// Columns identifying a row for deduplication
    pub primary_key: Vec<String>,
    /// Column selecting the newest duplicate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub increment_key: Option<String>,
    /// Pagination algorithm
    #[serde(default)]
    pub strategy: FetchStrategy,
    /// Included when every resource is run at once
    #[serde(default = "default_scheduled")]
    pub scheduled: bool,
    /// Declared fields; empty keeps rows as received
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldDef>,
}

fn default_scheduled() -> bool {
    true
}

impl ResourceDescriptor {
    /// Create a descriptor keyed on `id` with the sequential strategy
    pub fn new(
        name: impl Into<String>,
        table: impl Into<String>,
        endpoint: impl Into<String>,
        page_size: u32,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            endpoint: endpoint.into(),
            page_size,
            ordering_key: None,
            primary_key: vec!["id".to_string()],
            increment_key: None,
            strategy: FetchStrategy::default(),
            scheduled: true,
            fields: Vec::new(),
        }
    }

    /// Set the ordering key
    #[must_use]
    pub fn with_ordering_key(mut self, key: impl Into<String>) -> Self {
        self.ordering_key = Some(key.into());
        self
    }

    /// Set the primary key columns
    #[must_use]
    pub fn with_primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the increment key
    #[must_use]
    pub fn with_increment_key(mut self, key: impl Into<String>) -> Self {
        self.increment_key = Some(key.into());
        self
    }

    /// Set the fetch strategy
    #[must_use]
    pub fn with_strategy(mut self, strategy: FetchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Include or exclude this resource from run-all
    #[must_use]
    pub fn with_scheduled(mut self, scheduled: bool) -> Self {
        self.scheduled = scheduled;
        self
    }

    /// Set the declared fields
    #[must_use]
    pub fn with_fields(mut self, fields: Vec<FieldDef>) -> Self {
        self.fields = fields;
        self
    }

    /// Look up a declared field
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check the descriptor is usable
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: &str| Err(Error::config(format!("Resource '{}': {msg}", self.name)));

        if self.name.is_empty() {
            return Err(Error::config("Resource name cannot be empty"));
        }
        if self.table.is_empty() {
            return fail("table cannot be empty");
        }
        if self.endpoint.is_empty() {
            return fail("endpoint cannot be empty");
        }
        if self.page_size == 0 {
            return fail("page_size must be greater than 0");
        }
        if self.primary_key.is_empty() {
            return fail("primary_key cannot be empty");
        }
        if self.strategy == FetchStrategy::Reverse && self.ordering_key.is_none() {
            return fail("reverse strategy requires an ordering_key");
        }

        if !self.fields.is_empty() {
            let mut seen = HashSet::new();
            for field in &self.fields {
                if !seen.insert(field.name.as_str()) {
                    return fail(&format!("duplicate field '{}'", field.name));
                }
            }
            for key in &self.primary_key {
                if self.field(key).is_none() {
                    return fail(&format!("primary key '{key}' is not a declared field"));
                }
            }
        }

        Ok(())
    }
}
