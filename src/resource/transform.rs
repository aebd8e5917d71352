//! Row projection onto declared fields
//!
//! Pure: no I/O, no shared state. Runs between the fetch and the load.

use super::types::{FieldDef, FieldType, ResourceDescriptor};
use crate::error::{Error, Result};
use crate::pagination::TIMESTAMP_FORMAT;
use crate::types::{JsonValue, Row, RowSet};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// Project every row onto the descriptor's declared fields
pub fn transform(descriptor: &ResourceDescriptor, rows: RowSet) -> Result<RowSet> {
    if descriptor.fields.is_empty() {
        return Ok(rows);
    }

    rows.into_iter()
        .map(|row| transform_row(descriptor, &row))
        .collect()
}

fn transform_row(descriptor: &ResourceDescriptor, row: &Row) -> Result<Row> {
    for key in &descriptor.primary_key {
        if row.get(key).map_or(true, JsonValue::is_null) {
            return Err(Error::transform(
                key.clone(),
                format!("primary key missing in a {} row", descriptor.name),
            ));
        }
    }

    project(&descriptor.fields, row)
}

fn project(fields: &[FieldDef], row: &Row) -> Result<Row> {
    let mut out = Row::new();
    for field in fields {
        let value = row.get(&field.name).unwrap_or(&JsonValue::Null);
        out.insert(field.name.clone(), convert(field, value)?);
    }
    Ok(out)
}

fn convert(field: &FieldDef, value: &JsonValue) -> Result<JsonValue> {
    if value.is_null() {
        return Ok(match field.field_type {
            FieldType::Record => JsonValue::Object(Row::new()),
            // Serialized like any other value, so a missing one lands as "null"
            FieldType::Json => JsonValue::String("null".to_string()),
            _ => JsonValue::Null,
        });
    }

    let invalid = |expected: &str| {
        Error::transform(field.name.clone(), format!("expected {expected}, got {value}"))
    };

    match field.field_type {
        FieldType::Integer => match value {
            JsonValue::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
            JsonValue::String(s) => s
                .trim()
                .parse::<i64>()
                .map(JsonValue::from)
                .map_err(|_| invalid("an integer")),
            _ => Err(invalid("an integer")),
        },
        FieldType::String => Ok(match value {
            JsonValue::String(_) => value.clone(),
            other => JsonValue::String(other.to_string()),
        }),
        FieldType::Boolean => match value {
            JsonValue::Bool(_) => Ok(value.clone()),
            JsonValue::String(s) if s.eq_ignore_ascii_case("true") => Ok(JsonValue::Bool(true)),
            JsonValue::String(s) if s.eq_ignore_ascii_case("false") => Ok(JsonValue::Bool(false)),
            _ => Err(invalid("a boolean")),
        },
        FieldType::Timestamp => value
            .as_str()
            .and_then(parse_timestamp)
            .map(|ts| JsonValue::String(ts.to_rfc3339_opts(SecondsFormat::Secs, false)))
            .ok_or_else(|| invalid("a timestamp")),
        FieldType::Date => value
            .as_str()
            .and_then(parse_date)
            .map(|date| JsonValue::String(date.format("%Y-%m-%d").to_string()))
            .ok_or_else(|| invalid("a date")),
        FieldType::Record => match value {
            JsonValue::Object(inner) => Ok(JsonValue::Object(project(&field.fields, inner)?)),
            _ => Err(invalid("an object")),
        },
        FieldType::Json => Ok(JsonValue::String(value.to_string())),
    }
}

/// Parse an upstream timestamp into UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(raw).map(|ts| ts.date_naive()))
}
