// Axum API Server Module
//
// Purpose: thin JSON adapter over QueryEngine (filter choices, aggregates,
// cache control, dataset reload). No rendering happens here.
// CPU-bound query work runs on the blocking pool so the async runtime stays free.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::aggregations::AggregationKind;
use crate::config::Config;
use crate::data::DataSource;
use crate::domain::Dimension;
use crate::filter::FilterRequest;
use crate::query_engine::QueryEngine;

// ============================================================================
// Application State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<QueryEngine>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Load the configured dataset and build the engine
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        tracing::info!("Loading dataset from {:?}...", config.data_path);
        let load_config = config.clone();
        let engine = tokio::task::spawn_blocking(move || QueryEngine::from_config(&load_config)).await??;
        tracing::info!("Query engine ready ({} rows)", engine.row_count());

        Ok(Self::from_engine(engine, config))
    }

    pub fn from_engine(engine: QueryEngine, config: Config) -> Self {
        Self {
            engine: Arc::new(engine),
            config: Arc::new(config),
        }
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))

        // Filter choices
        .route("/api/filters/:dimension", get(get_filter_choices))

        // Aggregates
        .route("/api/aggregate", post(get_aggregate))
        .route("/api/aggregates", post(get_aggregates))

        // Cache and dataset lifecycle
        .route("/api/cache/stats", get(get_cache_stats))
        .route("/api/cache/invalidate", post(invalidate_cache))
        .route("/api/reload", post(reload_dataset))

        // Middleware (applied in reverse order)
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Request types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AggregateRequest {
    #[serde(default)]
    pub filter: FilterRequest,
    pub aggregation: AggregationKind,
}

#[derive(Debug, Deserialize)]
pub struct BatchAggregateRequest {
    #[serde(default)]
    pub filter: FilterRequest,
    pub aggregations: Vec<AggregationKind>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReloadRequest {
    /// Dataset path; the configured path when absent
    pub path: Option<PathBuf>,
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "rows": state.engine.row_count(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn get_filter_choices(
    State(state): State<AppState>,
    Path(dimension): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let dimension: Dimension = dimension.parse().map_err(AppError::BadRequest)?;
    let values = state.engine.get_filter_choices(dimension);

    Ok(Json(serde_json::json!({
        "dimension": dimension,
        "values": values,
    })))
}

async fn get_aggregate(
    State(state): State<AppState>,
    Json(req): Json<AggregateRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = state.engine.clone();

    let response = tokio::task::spawn_blocking(move || {
        let (filter, warnings) = engine.resolve_filter(&req.filter);
        let result = engine.get_aggregate(&filter, req.aggregation)?;

        Ok::<_, AppError>(serde_json::json!({
            "result": &*result,
            "warnings": warnings.iter().map(ToString::to_string).collect::<Vec<_>>(),
        }))
    })
    .await
    .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))??;

    Ok(Json(response))
}

async fn get_aggregates(
    State(state): State<AppState>,
    Json(req): Json<BatchAggregateRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = state.engine.clone();
    let start = std::time::Instant::now();
    let count = req.aggregations.len();

    let response = tokio::task::spawn_blocking(move || {
        let (filter, warnings) = engine.resolve_filter(&req.filter);
        let results: Vec<serde_json::Value> = engine
            .get_aggregates(&filter, &req.aggregations)
            .into_iter()
            .map(|(kind, result)| match result {
                Ok(result) => serde_json::json!({ "aggregation": kind, "result": &*result }),
                Err(e) => serde_json::json!({ "aggregation": kind, "error": e.to_string() }),
            })
            .collect();

        serde_json::json!({
            "results": results,
            "warnings": warnings.iter().map(ToString::to_string).collect::<Vec<_>>(),
        })
    })
    .await
    .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))?;

    tracing::info!("Batch of {} aggregates served in {:?}", count, start.elapsed());
    Ok(Json(response))
}

async fn get_cache_stats(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!(state.engine.cache_stats()))
}

async fn invalidate_cache(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.engine.invalidate_cache();
    Json(serde_json::json!({ "status": "invalidated" }))
}

async fn reload_dataset(
    State(state): State<AppState>,
    Json(req): Json<ReloadRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let path = req.path.unwrap_or_else(|| state.config.data_path.clone());
    let engine = state.engine.clone();

    tracing::info!("Reloading dataset from {:?}", path);
    tokio::task::spawn_blocking(move || engine.reload(DataSource::Path(path)))
        .await
        .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))?
        .map_err(|e| AppError::DataLoad(e.to_string()))?;

    Ok(Json(serde_json::json!({
        "status": "reloaded",
        "rows": state.engine.row_count(),
    })))
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Query(String),
    DataLoad(String),
    Internal(String),
}

impl From<crate::error::QueryError> for AppError {
    fn from(e: crate::error::QueryError) -> Self {
        AppError::Query(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Query(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::DataLoad(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
