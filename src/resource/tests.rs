//! Tests for resource descriptors and the row transform

use super::*;
use crate::error::Error;
use crate::pagination::FetchStrategy;
use crate::types::{Row, RowSet};
use pretty_assertions::assert_eq;
use serde_json::json;

fn row(value: serde_json::Value) -> Row {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("Expected object, got {other}"),
    }
}

fn contacts() -> ResourceDescriptor {
    ResourceDescriptor::new("LinkedinContacts", "LinkedinContacts", "linkedin/contacts/", 100)
        .with_ordering_key("updated")
        .with_increment_key("updated")
        .with_strategy(FetchStrategy::Reverse)
        .with_fields(vec![
            FieldDef::new("id", FieldType::Integer),
            FieldDef::new("name", FieldType::String),
            FieldDef::new("is_connected", FieldType::Boolean),
            FieldDef::new("updated", FieldType::Timestamp),
            FieldDef::record(
                "account",
                vec![
                    FieldDef::new("id", FieldType::Integer),
                    FieldDef::new("title", FieldType::String),
                ],
            ),
            FieldDef::new("tags", FieldType::Json),
        ])
}

// ============================================================================
// Descriptor
// ============================================================================

#[test]
fn test_descriptor_defaults() {
    let d = ResourceDescriptor::new("Tags", "tags", "tags/", 100);
    assert_eq!(d.primary_key, vec!["id".to_string()]);
    assert_eq!(d.strategy, FetchStrategy::Sequential);
    assert!(d.ordering_key.is_none());
    assert!(d.validate().is_ok());
}

#[test]
fn test_descriptor_yaml() {
    let yaml = r#"
name: LinkedinCounts
table: linkedin_counts
endpoint: linkedin/counts/
page_size: 1000
ordering_key: date
primary_key: [id]
strategy: async
fields:
  - name: id
    type: integer
  - name: date
    type: date
"#;
    let d: ResourceDescriptor = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(d.strategy, FetchStrategy::Async);
    assert_eq!(d.fields.len(), 2);
    assert_eq!(d.field("date").map(|f| f.field_type), Some(FieldType::Date));
    assert!(d.validate().is_ok());
}

#[test]
fn test_validate_rejects_zero_page_size() {
    let d = ResourceDescriptor::new("Tags", "tags", "tags/", 0);
    assert!(matches!(d.validate(), Err(Error::Config { .. })));
}

#[test]
fn test_validate_reverse_needs_ordering_key() {
    let d = ResourceDescriptor::new("Tags", "tags", "tags/", 10).with_strategy(FetchStrategy::Reverse);
    let err = d.validate().unwrap_err();
    assert!(err.to_string().contains("ordering_key"));
}

#[test]
fn test_validate_primary_key_must_be_declared() {
    let d = ResourceDescriptor::new("Tags", "tags", "tags/", 10)
        .with_fields(vec![FieldDef::new("name", FieldType::String)]);
    let err = d.validate().unwrap_err();
    assert!(err.to_string().contains("primary key 'id'"));
}

#[test]
fn test_validate_empty_primary_key() {
    let d = ResourceDescriptor::new("Tags", "tags", "tags/", 10).with_primary_key(Vec::<String>::new());
    assert!(d.validate().is_err());
}

#[test]
fn test_sql_types() {
    assert_eq!(FieldType::Integer.sql_type(), "BIGINT");
    assert_eq!(FieldType::Timestamp.sql_type(), "TIMESTAMP");
    assert_eq!(FieldType::Record.sql_type(), "VARCHAR");
    assert_eq!(FieldType::Json.sql_type(), "VARCHAR");
}

// ============================================================================
// Transform
// ============================================================================

#[test]
fn test_transform_projects_declared_fields() {
    let rows: RowSet = vec![row(json!({
        "id": 7,
        "name": "Ada",
        "is_connected": true,
        "updated": "2024-03-01T10:15:30+0200",
        "account": {"id": 3, "title": "Sales", "secret": "x"},
        "tags": ["a", "b"],
        "unlisted": "dropped"
    }))];

    let out = transform(&contacts(), rows).unwrap();

    assert_eq!(
        serde_json::Value::Object(out[0].clone()),
        json!({
            "id": 7,
            "name": "Ada",
            "is_connected": true,
            "updated": "2024-03-01T08:15:30+00:00",
            "account": {"id": 3, "title": "Sales"},
            "tags": "[\"a\",\"b\"]"
        })
    );
}

#[test]
fn test_transform_missing_fields_become_null() {
    let out = transform(&contacts(), vec![row(json!({"id": 1}))]).unwrap();

    assert_eq!(out[0]["name"], json!(null));
    assert_eq!(out[0]["updated"], json!(null));
    assert_eq!(out[0]["account"], json!({}));
    assert_eq!(out[0]["tags"], json!("null"));
}

#[test]
fn test_transform_null_json_field_is_serialized() {
    let out = transform(&contacts(), vec![row(json!({"id": 1, "tags": null}))]).unwrap();
    assert_eq!(out[0]["tags"], json!("null"));
}

#[test]
fn test_transform_missing_primary_key() {
    let err = transform(&contacts(), vec![row(json!({"name": "no id"}))]).unwrap_err();
    assert!(matches!(err, Error::Transform { ref field, .. } if field == "id"));
}

#[test]
fn test_transform_rejects_bad_timestamp() {
    let err = transform(&contacts(), vec![row(json!({"id": 1, "updated": "yesterday"}))]).unwrap_err();
    assert!(matches!(err, Error::Transform { ref field, .. } if field == "updated"));
}

#[test]
fn test_transform_coerces_scalars() {
    let out = transform(
        &contacts(),
        vec![row(json!({"id": "42", "name": 5, "is_connected": "FALSE"}))],
    )
    .unwrap();

    assert_eq!(out[0]["id"], json!(42));
    assert_eq!(out[0]["name"], json!("5"));
    assert_eq!(out[0]["is_connected"], json!(false));
}

#[test]
fn test_transform_date_field() {
    let d = ResourceDescriptor::new("LinkedinCounts", "linkedin_counts", "linkedin/counts/", 10)
        .with_fields(vec![
            FieldDef::new("id", FieldType::Integer),
            FieldDef::new("date", FieldType::Date),
        ]);

    let out = transform(
        &d,
        vec![
            row(json!({"id": 1, "date": "2024-05-06"})),
            row(json!({"id": 2, "date": "2024-05-07T23:00:00+00:00"})),
        ],
    )
    .unwrap();

    assert_eq!(out[0]["date"], json!("2024-05-06"));
    assert_eq!(out[1]["date"], json!("2024-05-07"));
}

#[test]
fn test_transform_without_fields_passes_through() {
    let d = ResourceDescriptor::new("Tags", "tags", "tags/", 10);
    let rows = vec![row(json!({"id": 1, "anything": {"deep": [1, 2]}}))];

    assert_eq!(transform(&d, rows.clone()).unwrap(), rows);
}

#[test]
fn test_parse_timestamp_formats() {
    let a = parse_timestamp("2024-01-01T00:00:00+0000").unwrap();
    let b = parse_timestamp("2024-01-01T00:00:00Z").unwrap();
    assert_eq!(a, b);
    assert!(parse_timestamp("2024-01-01").is_none());
}
