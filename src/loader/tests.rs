//! Tests for YAML loader module

use super::*;
use crate::error::Error;
use crate::pagination::FetchStrategy;
use crate::resource::FieldType;
use pretty_assertions::assert_eq;
use std::io::Write;

// ============================================================================
// Basic Loading Tests
// ============================================================================

#[test]
fn test_load_minimal_connector() {
    let yaml = r#"
name: test-connector
base_url: https://api.example.com/api/v1
resources:
  - name: Tags
    table: tags
    endpoint: tags/
    page_size: 100
    primary_key: [id]
"#;

    let def = load_connector_from_str(yaml).unwrap();
    assert_eq!(def.name, "test-connector");
    assert_eq!(def.base_url, "https://api.example.com/api/v1");
    assert_eq!(def.app_host, "https://app.aicorns.com");
    assert_eq!(def.http, HttpDefinition::default());
    assert_eq!(def.resources.len(), 1);

    let tags = def.resource("Tags").unwrap();
    assert_eq!(tags.strategy, FetchStrategy::Sequential);
    assert!(tags.scheduled);
    assert!(tags.fields.is_empty());
}

#[test]
fn test_load_http_definition() {
    let yaml = r#"
name: test
base_url: https://api.example.com
app_host: https://app.example.com
http:
  timeout_seconds: 5
  requests_per_second: 4
  concurrency: 3
  deadline_seconds: 60
  user_agent: tester/1.0
resources:
  - name: Tags
    table: tags
    endpoint: tags/
    page_size: 10
    primary_key: [id]
"#;

    let def = load_connector_from_str(yaml).unwrap();
    assert_eq!(def.app_host, "https://app.example.com");
    assert_eq!(def.http.timeout_seconds, 5);
    assert_eq!(def.http.requests_per_second, Some(4));
    assert_eq!(def.http.concurrency, 3);
    assert_eq!(def.http.deadline_seconds, 60);
    assert_eq!(def.http.user_agent.as_deref(), Some("tester/1.0"));
}

// ============================================================================
// Built-in Connector
// ============================================================================

#[test]
fn test_load_builtin_liaufa() {
    let def = load_connector("liaufa").unwrap();

    assert_eq!(def.base_url, "https://api.liaufa.com/api/v1");
    assert_eq!(
        def.resource_names(),
        vec![
            "LinkedinAccounts",
            "CampaignContacts",
            "CampaignInstances",
            "LinkedinContacts",
            "LinkedinSimpleMessenger",
            "Companies",
            "LinkedinCounts",
            "LinkedinContactsTags",
            "Tags",
        ]
    );
}

#[test]
fn test_builtin_resource_shapes() {
    let def = load_connector("liaufa").unwrap();

    let accounts = def.resource("LinkedinAccounts").unwrap();
    assert_eq!(accounts.table, "LinkedinAccount");
    assert_eq!(accounts.endpoint, "linkedin/accounts/");
    assert_eq!(accounts.page_size, 1000);

    let messenger = def.resource("LinkedinSimpleMessenger").unwrap();
    assert_eq!(messenger.strategy, FetchStrategy::Reverse);
    assert_eq!(messenger.ordering_key.as_deref(), Some("updated"));
    assert_eq!(messenger.increment_key.as_deref(), Some("updated"));
    assert_eq!(messenger.field("contact").unwrap().fields.len(), 1);

    let tags = def.resource("LinkedinContactsTags").unwrap();
    assert!(tags.ordering_key.is_none());
    assert_eq!(tags.page_size, 10);

    let companies = def.resource("Companies").unwrap();
    assert_eq!(
        companies.field("li_accounts_count").map(|f| f.field_type),
        Some(FieldType::Json)
    );
}

#[test]
fn test_builtin_scheduled_resources() {
    let def = load_connector("liaufa").unwrap();
    let scheduled: Vec<_> = def.scheduled_resources().map(|r| r.name.as_str()).collect();

    assert_eq!(scheduled.len(), 8);
    assert!(!scheduled.contains(&"LinkedinContacts"));
    assert!(def.resource("LinkedinContacts").is_some());
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(
        file,
        "name: local\nbase_url: http://localhost:8080\nresources:\n  - {{name: Tags, table: tags, endpoint: tags/, page_size: 5, primary_key: [id]}}"
    )
    .unwrap();

    let def = load_connector(file.path()).unwrap();
    assert_eq!(def.name, "local");
    assert_eq!(def.resource("Tags").unwrap().page_size, 5);
}

#[test]
fn test_load_unknown_connector() {
    let err = load_connector("does-not-exist").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("not found"));
    assert!(message.contains("liaufa"));
}

// ============================================================================
// Validation Tests
// ============================================================================

#[test]
fn test_reject_empty_resources() {
    let yaml = "name: t\nbase_url: https://api.example.com\nresources: []\n";
    assert!(matches!(load_connector_from_str(yaml), Err(Error::Config { .. })));
}

#[test]
fn test_reject_invalid_base_url() {
    let yaml = r#"
name: t
base_url: not a url
resources:
  - {name: Tags, table: tags, endpoint: tags/, page_size: 5, primary_key: [id]}
"#;
    assert!(matches!(load_connector_from_str(yaml), Err(Error::InvalidUrl(_))));
}

#[test]
fn test_reject_duplicate_resource_names() {
    let yaml = r#"
name: t
base_url: https://api.example.com
resources:
  - {name: Tags, table: tags, endpoint: tags/, page_size: 5, primary_key: [id]}
  - {name: Tags, table: tags2, endpoint: tags2/, page_size: 5, primary_key: [id]}
"#;
    let err = load_connector_from_str(yaml).unwrap_err();
    assert!(err.to_string().contains("Duplicate resource name"));
}

#[test]
fn test_reject_reverse_without_ordering_key() {
    let yaml = r#"
name: t
base_url: https://api.example.com
resources:
  - {name: Tags, table: tags, endpoint: tags/, page_size: 5, primary_key: [id], strategy: reverse}
"#;
    assert!(load_connector_from_str(yaml).is_err());
}

#[test]
fn test_reject_unknown_field_type() {
    let yaml = r#"
name: t
base_url: https://api.example.com
resources:
  - name: Tags
    table: tags
    endpoint: tags/
    page_size: 5
    primary_key: [id]
    fields:
      - {name: id, type: geography}
"#;
    assert!(matches!(load_connector_from_str(yaml), Err(Error::Config { .. })));
}

#[test]
fn test_reject_zero_concurrency() {
    let yaml = r#"
name: t
base_url: https://api.example.com
http:
  concurrency: 0
resources:
  - {name: Tags, table: tags, endpoint: tags/, page_size: 5, primary_key: [id]}
"#;
    assert!(load_connector_from_str(yaml).is_err());
}
