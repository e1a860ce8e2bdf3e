// src/api.rs
//! Presentation boundary: on-demand trigger, recent-analysis read, liveness.
//! Thin by design; all behavior lives in the pipeline components.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::{error, info};

use crate::analysis::Analysis;
use crate::history::RecentAnalyses;
use crate::monitor::MonitoringService;

#[derive(Clone)]
pub struct AppState {
    pub monitor: Arc<MonitoringService>,
    pub history: Arc<RecentAnalyses>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/analyze", post(analyze_market))
        .route("/api/recent", get(recent_analyses))
        .route("/api/health", get(health_check))
        .fallback_service(ServeDir::new("static"))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Trigger an on-demand sweep over every tracked symbol, bypassing both the
/// hourly gate and the significance filter. Returns the analyses produced by
/// this call; they are also inserted into the recent store.
async fn analyze_market(
    State(state): State<AppState>,
) -> Result<Json<Vec<Analysis>>, (StatusCode, String)> {
    info!("on-demand analysis requested");
    match state.monitor.analyze_all().await {
        Ok(analyses) => Ok(Json(analyses)),
        Err(e) => {
            error!(error = %e, "on-demand analysis failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// Recent analyses, head-first (most recent first).
async fn recent_analyses(State(state): State<AppState>) -> Json<Vec<Analysis>> {
    Json(state.history.snapshot())
}

#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    monitored_tickers: Vec<String>,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        monitored_tickers: state.monitor.tickers().to_vec(),
    })
}
