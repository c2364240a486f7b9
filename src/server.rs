use std::{
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::Value;
use tokio::signal::unix::{SignalKind, signal};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::{
    config::Config,
    decision::{BatchReport, DecisionOrchestrator, run_batch},
    schema::{DecisionRequest, DecisionResponse, SchemaError},
};

pub const SERVICE_NAME: &str = "Clarity AI Decision Agent";

const FEATURES: [&str; 6] = [
    "Decision recommendations",
    "Reasoning chains",
    "Confidence scores",
    "Alternative options",
    "Fallback handling",
    "Batch processing",
];

#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<DecisionOrchestrator>,
    model: String,
}

impl AppState {
    pub fn new(orchestrator: Arc<DecisionOrchestrator>, model: impl Into<String>) -> Self {
        Self {
            orchestrator,
            model: model.into(),
        }
    }
}

/// A rejected request body, rendered as `422 {error, detail}`.
#[derive(Debug, Serialize)]
pub struct ApiError {
    error: &'static str,
    detail: String,
}

impl ApiError {
    fn invalid_request(detail: impl Into<String>) -> Self {
        Self {
            error: "invalid_request",
            detail: detail.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid_request(rejection.body_text())
    }
}

impl From<SchemaError> for ApiError {
    fn from(err: SchemaError) -> Self {
        Self::invalid_request(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (StatusCode::UNPROCESSABLE_ENTITY, Json(self)).into_response()
    }
}

#[derive(Debug, Serialize)]
struct ServiceStatus {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct HealthStatus {
    status: &'static str,
    timestamp: f64,
}

#[derive(Debug, Serialize)]
struct ServiceConfigView {
    timeout_seconds: Value,
    model: String,
    features: [&'static str; 6],
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(service_status))
        .route("/health", get(health))
        .route("/api/decision", post(decide))
        .route("/api/decision/batch", post(decide_batch))
        .route("/api/config", get(service_config))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(config: Config, orchestrator: Arc<DecisionOrchestrator>) -> Result<()> {
    let mut sigint =
        signal(SignalKind::interrupt()).context("unable to listen for SIGINT (Ctrl+C)")?;
    let mut sigterm = signal(SignalKind::terminate()).context("unable to listen for SIGTERM")?;

    let listener = tokio::net::TcpListener::bind(config.server.bind)
        .await
        .with_context(|| format!("unable to bind {}", config.server.bind))?;
    let app = router(AppState::new(orchestrator, config.model.model.clone()));

    tracing::info!(
        target: "server",
        bind = %config.server.bind,
        model = %config.model.model,
        timeout_ms = config.decision.timeout_ms,
        "server_listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let signal_name = tokio::select! {
                _ = sigint.recv() => "SIGINT",
                _ = sigterm.recv() => "SIGTERM",
            };
            tracing::info!(target: "server", signal = signal_name, "server_shutdown_requested");
        })
        .await
        .context("http server failed")?;

    tracing::info!(target: "server", "server_stopped");
    Ok(())
}

async fn service_status() -> Json<ServiceStatus> {
    Json(ServiceStatus {
        status: "healthy",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn health() -> Json<HealthStatus> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or_default();
    Json(HealthStatus {
        status: "ok",
        timestamp,
    })
}

async fn decide(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<DecisionResponse>, ApiError> {
    let Json(body) = body?;
    let request: DecisionRequest = serde_json::from_value(body)
        .map_err(|err| SchemaError::malformed("decision request", err))?;

    let report = state
        .orchestrator
        .decide(Uuid::now_v7().to_string(), request.decision_input)
        .await;
    tracing::info!(
        target: "server",
        request_id = %report.request_id,
        path = ?report.path,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "decision_served"
    );

    Ok(Json(DecisionResponse {
        decision_output: report.output,
    }))
}

async fn decide_batch(
    State(state): State<AppState>,
    body: Result<Json<Vec<Value>>, JsonRejection>,
) -> Result<Json<BatchReport>, ApiError> {
    let Json(items) = body?;
    Ok(Json(run_batch(state.orchestrator.as_ref(), items).await))
}

async fn service_config(State(state): State<AppState>) -> Json<ServiceConfigView> {
    Json(ServiceConfigView {
        timeout_seconds: timeout_seconds(state.orchestrator.timeout()),
        model: state.model.clone(),
        features: FEATURES,
    })
}

/// Whole-second budgets are reported as integers, anything finer as a float.
fn timeout_seconds(timeout: Duration) -> Value {
    if timeout.subsec_nanos() == 0 {
        Value::from(timeout.as_secs())
    } else {
        Value::from(timeout.as_secs_f64())
    }
}
