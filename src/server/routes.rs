use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::error::ApiError;
use super::AppState;
use crate::models::{AnalysisRequest, CacheEntry, Recommendation, SymbolSummary};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub openai_configured: bool,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_symbols_analyzed: usize,
    pub last_analyses: BTreeMap<String, SymbolSummary>,
    pub server_uptime: &'static str,
    pub openai_model: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/analyze", post(analyze))
        .route("/recommendations/:symbol", get(get_recommendations))
        .route("/stats", get(stats))
        .route("/clear_cache", post(clear_cache))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        openai_configured: state.analyzer.engine().client().is_configured(),
    })
}

async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Result<Json<Recommendation>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let outcome = state.analyzer.analyze(&request).await?;
    Ok(Json(outcome.recommendation))
}

async fn get_recommendations(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<CacheEntry>, ApiError> {
    state
        .analyzer
        .cache()
        .get(&symbol)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No analysis available for symbol".to_string()))
}

async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state.analyzer.cache().stats()?;

    Ok(Json(StatsResponse {
        total_symbols_analyzed: stats.count,
        last_analyses: stats.symbols,
        server_uptime: "running",
        openai_model: state.analyzer.engine().client().model().to_string(),
    }))
}

async fn clear_cache(State(state): State<AppState>) -> Result<Json<MessageResponse>, ApiError> {
    let removed = state.analyzer.cache().clear()?;
    tracing::info!("Analysis cache cleared ({} entries)", removed);

    Ok(Json(MessageResponse {
        message: "Cache cleared successfully",
    }))
}
