//! Health, progress and metrics endpoints
//!
//! Served only when `http_port` is configured, for watching long runs.

use crate::metrics::TranslatorMetrics;
use crate::shard::{ProgressCounts, ShardState};
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub worker_index: usize,
}

/// Progress response
#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub worker_index: usize,
    pub worker_count: usize,
    #[serde(flatten)]
    pub counts: ProgressCounts,
    pub done: usize,
}

impl ProgressResponse {
    pub fn from_state(state: &ShardState) -> Self {
        let assignment = state.assignment();
        let counts = state.counts();
        Self {
            worker_index: assignment.worker_index(),
            worker_count: assignment.worker_count(),
            counts,
            done: counts.done(),
        }
    }
}

/// Application state for the endpoints
#[derive(Clone)]
pub struct AppState {
    pub shard_state: ShardState,
    pub metrics: Arc<TranslatorMetrics>,
}

/// Create the router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/progress", get(progress_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Health endpoint - always returns 200 if process is running
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        worker_index: state.shard_state.assignment().worker_index(),
    })
}

async fn progress_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(ProgressResponse::from_state(&state.shard_state))
}

/// Metrics endpoint - returns Prometheus format metrics
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.metrics.render(),
    )
}
