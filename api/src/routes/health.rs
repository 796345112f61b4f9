//! GET /health: liveness plus a snapshot of every LLM profile.

use std::sync::Arc;

use ai_llm_service::health_service::HealthStatus;
use axum::{Json, extract::State};
use serde::Serialize;

use crate::core::app_state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub llm: Vec<HealthStatus>,
}

/// Always `200`; provider problems show up as `ok: false` entries.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        llm: state.llm.health_all().await,
    })
}
