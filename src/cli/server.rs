//! HTTP server mode for triggering resource runs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::engine::SyncEngine;
use crate::error::{Error, Result};
use crate::pagination::FetchStrategy;

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Engine every trigger runs against
    pub engine: Arc<SyncEngine>,
}

/// App state shared across handlers
#[derive(Clone)]
struct AppState {
    engine: Arc<SyncEngine>,
}

/// Request body for the root trigger
///
/// Either `resource` (single run) or `tasks` (run-all) must be present.
#[derive(Debug, Default, Deserialize)]
struct TriggerRequest {
    #[serde(default)]
    resource: Option<String>,
    #[serde(default)]
    tasks: Option<Value>,
    #[serde(default)]
    strategy: Option<FetchStrategy>,
}

/// Request body for `POST /run/:resource`
#[derive(Debug, Default, Deserialize)]
struct RunRequest {
    #[serde(default)]
    strategy: Option<FetchStrategy>,
}

/// Response wrapper
#[derive(Debug, Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn error(msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// Build the router
fn router(state: AppState) -> Router {
    // Build CORS layer - allow all origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", post(trigger))
        .route("/run/:resource", post(run_resource))
        .route("/resources", get(list_resources))
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Start the HTTP server
pub async fn serve(config: ServerConfig, port: u16) -> Result<()> {
    let app = router(AppState {
        engine: config.engine,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting HTTP server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::config(format!("Failed to bind to port {port}: {e}")))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::config(format!("Server error: {e}")))?;

    Ok(())
}

/// Map an engine error onto an HTTP status
fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
        Error::Config { .. } => StatusCode::BAD_REQUEST,
        Error::AuthRejected { .. } | Error::AuthExhausted { .. } | Error::UpstreamError { .. } => {
            StatusCode::BAD_GATEWAY
        }
        Error::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: &Error) -> Response {
    (
        status_for(error),
        Json(ApiResponse::<()>::error(error.to_string())),
    )
        .into_response()
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// List the resources a trigger can name
async fn list_resources(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let definition = state.engine.definition();
    let resources: Vec<Value> = definition
        .resources
        .iter()
        .map(|r| {
            json!({
                "name": r.name,
                "table": r.table,
                "strategy": r.strategy.as_str(),
                "scheduled": r.scheduled,
            })
        })
        .collect();

    Json(ApiResponse::success(json!({
        "connector": definition.name,
        "resources": resources,
    })))
}

/// Root trigger: one resource or every scheduled resource
async fn trigger(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TriggerRequest>,
) -> Response {
    if let Some(name) = req.resource {
        return run_one(&state.engine, &name, req.strategy).await;
    }

    if req.tasks.is_some() {
        let summary = state.engine.run_all().await;
        let error = (!summary.all_succeeded()).then(|| {
            format!(
                "{} of {} resources failed",
                summary.failed, summary.resources
            )
        });
        let response = ApiResponse {
            success: error.is_none(),
            data: Some(summary),
            error,
        };
        return (StatusCode::OK, Json(response)).into_response();
    }

    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error(
            "Request must name a 'resource' or carry 'tasks'",
        )),
    )
        .into_response()
}

/// Run a resource named in the path
async fn run_resource(
    State(state): State<Arc<AppState>>,
    Path(resource): Path<String>,
    body: Option<Json<RunRequest>>,
) -> Response {
    let strategy = body.and_then(|Json(req)| req.strategy);
    run_one(&state.engine, &resource, strategy).await
}

async fn run_one(engine: &SyncEngine, name: &str, strategy: Option<FetchStrategy>) -> Response {
    let descriptor = match engine.resource(name) {
        Ok(descriptor) => descriptor,
        Err(e) => return error_response(&e),
    };

    let result = match strategy {
        Some(strategy) => engine.run_with_strategy(descriptor, strategy).await,
        None => engine.run(descriptor).await,
    };

    match result {
        Ok(result) => (StatusCode::OK, Json(ApiResponse::success(result))).into_response(),
        Err(e) => {
            tracing::error!("{}: triggered run failed: {}", name, e);
            error_response(&e)
        }
    }
}
