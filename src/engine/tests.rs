//! Tests for engine module

use super::*;
use crate::auth::AuthRetryConfig;
use crate::loader::HttpDefinition;
use crate::pagination::RetryPolicy;
use crate::resource::{FieldDef, FieldType};
use crate::types::BackoffType;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Mutex;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helpers
// ============================================================================

/// In-memory warehouse that records what it is asked
#[derive(Default)]
struct RecordingWarehouse {
    stored_rows: u64,
    max_value: Option<String>,
    loads: Mutex<Vec<(String, RowSet)>>,
    max_value_calls: Mutex<Vec<(String, String)>>,
}

impl Warehouse for RecordingWarehouse {
    fn row_count(&self, _table: &str) -> Result<u64> {
        Ok(self.stored_rows)
    }

    fn max_value(&self, table: &str, column: &str) -> Result<Option<String>> {
        self.max_value_calls
            .lock()
            .unwrap()
            .push((table.to_string(), column.to_string()));
        Ok(self.max_value.clone())
    }

    fn load(&self, descriptor: &ResourceDescriptor, rows: &RowSet) -> Result<u64> {
        self.loads
            .lock()
            .unwrap()
            .push((descriptor.table.clone(), rows.clone()));
        Ok(rows.len() as u64)
    }
}

fn tags() -> ResourceDescriptor {
    ResourceDescriptor::new("Tags", "tags", "tags/", 2)
        .with_ordering_key("updated")
        .with_fields(vec![
            FieldDef::new("id", FieldType::Integer),
            FieldDef::new("updated", FieldType::Timestamp),
        ])
}

fn broken() -> ResourceDescriptor {
    ResourceDescriptor::new("Broken", "broken", "broken/", 2)
}

fn definition(resources: Vec<ResourceDescriptor>) -> ConnectorDefinition {
    ConnectorDefinition {
        name: "test".to_string(),
        base_url: "http://unused".to_string(),
        app_host: "https://app.example.com".to_string(),
        http: HttpDefinition::default(),
        resources,
    }
}

fn engine(server: &MockServer, warehouse: Arc<RecordingWarehouse>) -> SyncEngine {
    let config = EngineConfig::builder()
        .base_url(server.uri())
        .auth_retry(AuthRetryConfig::new(2, Duration::from_millis(1)))
        .retry(RetryPolicy::default().with_backoff(
            BackoffType::Constant,
            Duration::from_millis(1),
            Duration::from_millis(1),
        ))
        .build();

    SyncEngine::new(
        definition(vec![tags(), broken()]),
        config,
        Credentials::new("u", "p"),
        warehouse,
    )
}

fn day(n: u64) -> String {
    format!("2024-01-{n:02}T00:00:00+0000")
}

fn page_body(count: u64, first: u64, len: u64) -> Value {
    let results: Vec<Value> = (first..first + len)
        .map(|id| json!({"id": id, "updated": day(id), "noise": true}))
        .collect();
    json!({"count": count, "results": results})
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "tok"})))
        .mount(server)
        .await;
}

async fn mount_tags(server: &MockServer, pages: u64) {
    let count = pages * 2;
    Mock::given(method("GET"))
        .and(path("/tags/"))
        .and(query_param("page", "1"))
        .and(query_param("page_size", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(count, 1, 1)))
        .mount(server)
        .await;

    for page in 1..=pages {
        Mock::given(method("GET"))
            .and(path("/tags/"))
            .and(query_param("page", page.to_string()))
            .and(query_param("page_size", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(count, page * 2 - 1, 2)))
            .mount(server)
            .await;
    }
}

fn first_page_requested(requests: &[wiremock::Request]) -> Option<String> {
    requests
        .iter()
        .filter(|r| r.url.path() == "/tags/")
        .find_map(|r| {
            let pairs: std::collections::HashMap<_, _> = r.url.query_pairs().into_owned().collect();
            (pairs.get("page_size").map(String::as_str) == Some("2"))
                .then(|| pairs.get("page").cloned())
                .flatten()
        })
}

// ============================================================================
// Result Types
// ============================================================================

#[test]
fn test_fetch_result_serialization() {
    let empty = serde_json::to_value(FetchResult::empty("tags")).unwrap();
    assert_eq!(empty, json!({"table": "tags", "num_processed": 0}));

    let loaded = serde_json::to_value(FetchResult::loaded("tags", 6, 6)).unwrap();
    assert_eq!(
        loaded,
        json!({"table": "tags", "num_processed": 6, "output_rows": 6})
    );
}

#[test]
fn test_run_summary_tally() {
    let outcomes = vec![
        RunOutcome::from_result("Tags", Ok(FetchResult::loaded("tags", 4, 4))),
        RunOutcome::from_result("Broken", Err(Error::upstream(500, "boom"))),
        RunOutcome::from_result("Empty", Ok(FetchResult::empty("empty"))),
    ];

    let summary = RunSummary::from_outcomes(outcomes, 12);
    assert_eq!(summary.resources, 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.rows_processed, 4);
    assert!(!summary.all_succeeded());
    assert!(summary.outcomes[1].error.as_deref().unwrap().contains("500"));
}

// ============================================================================
// Runs
// ============================================================================

#[tokio::test]
async fn test_run_fetches_transforms_and_loads() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_tags(&server, 3).await;

    let warehouse = Arc::new(RecordingWarehouse::default());
    let result = engine(&server, warehouse.clone())
        .run_resource("Tags")
        .await
        .unwrap();

    assert_eq!(result, FetchResult::loaded("tags", 6, 6));

    let loads = warehouse.loads.lock().unwrap();
    assert_eq!(loads.len(), 1);
    let (table, rows) = &loads[0];
    assert_eq!(table, "tags");
    // Undeclared fields are projected away and timestamps normalized
    assert!(rows[0].get("noise").is_none());
    assert_eq!(rows[0]["updated"], json!("2024-01-01T00:00:00+00:00"));
}

#[tokio::test]
async fn test_run_with_nothing_fetched_skips_load() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_tags(&server, 0).await;

    let warehouse = Arc::new(RecordingWarehouse::default());
    let engine = engine(&server, warehouse.clone());
    let result = engine
        .run_with_strategy(&tags(), FetchStrategy::Async)
        .await
        .unwrap();

    assert_eq!(result, FetchResult::empty("tags"));
    assert!(warehouse.loads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_delta_reads_stored_row_count() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_tags(&server, 3).await;

    let warehouse = Arc::new(RecordingWarehouse {
        stored_rows: 4,
        ..RecordingWarehouse::default()
    });
    let result = engine(&server, warehouse)
        .run_with_strategy(&tags(), FetchStrategy::Delta)
        .await
        .unwrap();

    assert_eq!(result.num_processed, 4);
    let requests = server.received_requests().await.unwrap();
    assert_eq!(first_page_requested(&requests).as_deref(), Some("2"));
}

#[tokio::test]
async fn test_reverse_reads_watermark_from_warehouse() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_tags(&server, 5).await;

    let warehouse = Arc::new(RecordingWarehouse {
        max_value: Some("2024-01-05 00:00:00".to_string()),
        ..RecordingWarehouse::default()
    });
    let result = engine(&server, warehouse.clone())
        .run_with_strategy(&tags(), FetchStrategy::Reverse)
        .await
        .unwrap();

    // Pages 5, 4, 3 and 2; page 2 ends on day 4
    assert_eq!(result.num_processed, 8);
    assert_eq!(
        warehouse.max_value_calls.lock().unwrap().as_slice(),
        &[("tags".to_string(), "updated".to_string())]
    );
}

#[tokio::test]
async fn test_reverse_without_stored_rows_walks_everything() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_tags(&server, 3).await;

    let warehouse = Arc::new(RecordingWarehouse::default());
    let result = engine(&server, warehouse)
        .run_with_strategy(&tags(), FetchStrategy::Reverse)
        .await
        .unwrap();

    assert_eq!(result.num_processed, 6);
}

#[tokio::test]
async fn test_run_unknown_resource() {
    let server = MockServer::start().await;
    let engine = engine(&server, Arc::new(RecordingWarehouse::default()));

    let err = engine.run_resource("Nope").await.unwrap_err();
    assert!(matches!(err, Error::ResourceNotFound { ref name } if name == "Nope"));
}

#[tokio::test]
async fn test_run_error_surfaces_without_load() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/broken/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let warehouse = Arc::new(RecordingWarehouse::default());
    let err = engine(&server, warehouse.clone())
        .run_resource("Broken")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UpstreamError { status: 500, .. }));
    assert!(warehouse.loads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_run_all_reports_each_resource() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_tags(&server, 2).await;

    Mock::given(method("GET"))
        .and(path("/broken/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let warehouse = Arc::new(RecordingWarehouse::default());
    let summary = engine(&server, warehouse).run_all().await;

    assert_eq!(summary.resources, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.rows_processed, 4);
    assert_eq!(summary.outcomes[0].resource, "Tags");
    assert!(summary.outcomes[1].error.is_some());
}

#[tokio::test]
async fn test_run_all_skips_unscheduled_resources() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_tags(&server, 1).await;

    let config = EngineConfig::builder()
        .base_url(server.uri())
        .auth_retry(AuthRetryConfig::new(1, Duration::from_millis(1)))
        .build();
    let engine = SyncEngine::new(
        definition(vec![tags(), broken().with_scheduled(false)]),
        config,
        Credentials::default(),
        Arc::new(RecordingWarehouse::default()),
    );

    let summary = engine.run_all().await;
    assert_eq!(summary.resources, 1);
    assert!(summary.all_succeeded());
}
