//! Callsight HTTP server
//!
//! Axum-based server for the dashboard pages and a small JSON API.
//!
//! Architecture: each JSON endpoint has a thin axum handler that delegates to
//! an inner function returning `(StatusCode, Value)`. The inner functions are
//! directly testable without axum dispatch machinery. The HTML pages in
//! `pages` share the same dataset and prediction helpers.
//!
//! Every request re-reads the dataset so the CSV file stays the source of
//! truth; no table is cached between requests.
//!
//! Endpoints:
//! - GET  /health          — dataset and model status
//! - GET  /version         — server version info
//! - GET  /api/categories  — agents and topics
//! - GET  /api/stats       — historical satisfaction aggregates
//! - POST /api/predict     — predict a satisfaction rating
//! - POST /api/sessions    — append a session to the dataset

use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use callsight_core::{
    append_session, load_dataset, summarize, CallsightConfig, CallsightError, Dataset,
    FeatureRow, ModelError, NewSession, Predictor, SatisfactionSummary,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Mutex};

use crate::pages;

/// Shared state for all HTTP handlers
pub struct HttpState {
    pub config: CallsightConfig,
    pub predictor: Predictor,
    /// Held across re-read, append and rewrite so appends from concurrent
    /// requests in this process do not overwrite each other. Other processes
    /// writing the same file are not coordinated.
    pub write_lock: Mutex<()>,
}

impl HttpState {
    pub fn new(config: CallsightConfig) -> Self {
        let predictor = Predictor::new(config.model.clone());
        Self {
            config,
            predictor,
            write_lock: Mutex::new(()),
        }
    }
}

/// Build the Axum router with all pages and endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/api/categories", get(categories_handler))
        .route("/api/stats", get(stats_handler))
        .route("/api/predict", post(predict_handler))
        .route("/api/sessions", post(add_session_handler))
        .merge(pages::page_routes())
        .fallback(pages::not_found)
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    config: CallsightConfig,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", config.http.host, config.http.port);
    let state = Arc::new(HttpState::new(config));

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Callsight dashboard listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request / Response DTOs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct PredictRequest {
    pub agent: String,
    pub topic: String,
    pub speed_of_answer: u32,
    pub avg_talk_duration: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictOutcome {
    pub prediction: i64,
    pub model: &'static str,
    pub summary: SatisfactionSummary,
}

// ============================================================================
// Shared actions (used by JSON handlers and HTML pages)
// ============================================================================

/// Read the dataset for this request.
pub async fn load_context(state: &HttpState) -> std::result::Result<Dataset, CallsightError> {
    let path = state.config.dataset.path.clone();
    tokio::task::spawn_blocking(move || load_dataset(path))
        .await
        .map_err(|e| CallsightError::Io(std::io::Error::other(e.to_string())))?
}

/// Load the dataset, then predict with its encoders.
pub async fn run_prediction(
    state: &HttpState,
    req: &PredictRequest,
) -> std::result::Result<PredictOutcome, CallsightError> {
    let dataset = load_context(state).await?;
    predict_with(state, &dataset, req).await
}

/// Encode the request with `dataset`'s encoders and run the model.
pub async fn predict_with(
    state: &HttpState,
    dataset: &Dataset,
    req: &PredictRequest,
) -> std::result::Result<PredictOutcome, CallsightError> {
    validate_duration(req.avg_talk_duration)?;
    let row = FeatureRow::encode(
        &dataset.agents,
        &dataset.topics,
        &req.agent,
        &req.topic,
        req.speed_of_answer,
        req.avg_talk_duration,
    )?;

    let predictor = state.predictor.clone();
    let prediction = tokio::task::spawn_blocking(move || predictor.predict(&row))
        .await
        .map_err(|e| ModelError::OnnxInference(format!("spawn_blocking join error: {e}")))??;

    let prediction = prediction
        .first()
        .copied()
        .ok_or_else(|| ModelError::SchemaMismatch {
            expected: "1 label".to_string(),
            actual: "0 labels".to_string(),
        })?;

    Ok(PredictOutcome {
        prediction,
        model: state.config.model.backend.as_str(),
        summary: summarize(dataset),
    })
}

/// Append a session and return the new row count.
pub async fn run_add_session(
    state: &HttpState,
    session: NewSession,
) -> std::result::Result<usize, CallsightError> {
    validate_duration(session.avg_talk_duration)?;
    let _guard = state.write_lock.lock().await;
    let path = state.config.dataset.path.clone();
    tokio::task::spawn_blocking(move || -> callsight_core::Result<usize> {
        let mut dataset = load_dataset(path)?;
        append_session(&mut dataset, &session)?;
        Ok(dataset.table.len())
    })
    .await
    .map_err(|e| CallsightError::Io(std::io::Error::other(e.to_string())))?
}

fn validate_duration(seconds: f64) -> std::result::Result<(), CallsightError> {
    if seconds.is_finite() && seconds >= 0.0 {
        Ok(())
    } else {
        Err(CallsightError::InvalidInput(format!(
            "average talk duration must be a non-negative number of seconds, got {seconds}"
        )))
    }
}

/// Status code for a failed action: user input problems are 422, the rest 500.
pub fn error_status(err: &CallsightError) -> StatusCode {
    if err.is_user_error() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn error_body(msg: impl Into<String>) -> serde_json::Value {
    serde_json::json!({
        "error": msg.into(),
        "status": "error",
    })
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner health check — loads the dataset and reports its shape.
pub async fn health_inner(state: &HttpState) -> (StatusCode, serde_json::Value) {
    match load_context(state).await {
        Ok(dataset) => (
            StatusCode::OK,
            serde_json::json!({
                "status": "healthy",
                "version": env!("CARGO_PKG_VERSION"),
                "dataset": state.config.dataset.path,
                "sessions": dataset.table.len(),
                "agents": dataset.agents.len(),
                "topics": dataset.topics.len(),
                "model_backend": state.config.model.backend.as_str(),
                "model_path": state.config.model.path,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            serde_json::json!({
                "status": "unhealthy",
                "error": e.to_string(),
            }),
        ),
    }
}

/// Inner version — returns version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "name": "callsight",
    })
}

pub async fn categories_inner(state: &HttpState) -> (StatusCode, serde_json::Value) {
    match load_context(state).await {
        Ok(dataset) => (
            StatusCode::OK,
            serde_json::json!({
                "agents": dataset.agents.classes(),
                "topics": dataset.topics.classes(),
            }),
        ),
        Err(e) => (error_status(&e), error_body(e.to_string())),
    }
}

pub async fn stats_inner(state: &HttpState) -> (StatusCode, serde_json::Value) {
    match load_context(state).await {
        Ok(dataset) => (
            StatusCode::OK,
            serde_json::to_value(summarize(&dataset)).unwrap_or_default(),
        ),
        Err(e) => (error_status(&e), error_body(e.to_string())),
    }
}

/// Inner predict — 422 for unseen categories, 500 for dataset or model failures.
pub async fn predict_inner(
    state: &HttpState,
    req: PredictRequest,
) -> (StatusCode, serde_json::Value) {
    match run_prediction(state, &req).await {
        Ok(outcome) => (
            StatusCode::OK,
            serde_json::json!({
                "prediction": outcome.prediction,
                "model": outcome.model,
            }),
        ),
        Err(e) => {
            tracing::warn!("Prediction failed: {}", e);
            (error_status(&e), error_body(e.to_string()))
        }
    }
}

/// Inner add-session — validates the rating, then appends.
pub async fn add_session_inner(
    state: &HttpState,
    session: NewSession,
) -> (StatusCode, serde_json::Value) {
    if let Err(msg) = pages::validate_rating(session.satisfaction_rating) {
        return (StatusCode::UNPROCESSABLE_ENTITY, error_body(msg));
    }

    match run_add_session(state, session).await {
        Ok(rows) => (
            StatusCode::OK,
            serde_json::json!({
                "added": true,
                "rows": rows,
            }),
        ),
        Err(e) => {
            tracing::warn!("Add session failed: {}", e);
            (error_status(&e), error_body(e.to_string()))
        }
    }
}

// ============================================================================
// Axum handler wrappers (thin — delegate to inner functions)
// ============================================================================

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state).await;
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn categories_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = categories_inner(&state).await;
    (status, Json(body))
}

pub async fn stats_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = stats_inner(&state).await;
    (status, Json(body))
}

pub async fn predict_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<PredictRequest>,
) -> impl IntoResponse {
    let (status, body) = predict_inner(&state, req).await;
    (status, Json(body))
}

pub async fn add_session_handler(
    State(state): State<Arc<HttpState>>,
    Json(session): Json<NewSession>,
) -> impl IntoResponse {
    let (status, body) = add_session_inner(&state, session).await;
    (status, Json(body))
}

// ============================================================================
// Unit Tests — call inner functions directly
// ============================================================================
