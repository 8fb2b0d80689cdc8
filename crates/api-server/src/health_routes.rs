use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: String,
    pub cache_status: CacheStatusBody,
}

#[derive(Serialize)]
pub struct CacheStatusBody {
    pub is_cached: bool,
    pub last_updated: Option<DateTime<Utc>>,
    pub cache_age_seconds: Option<u64>,
    pub cache_duration_seconds: u64,
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/api/health", get(health_check))
}

/// Liveness plus a read-only view of the snapshot cache. Never triggers a fetch.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = state.orchestrator.cache_status();

    Json(HealthResponse {
        status: "healthy",
        message: format!(
            "Portfolio metrics API is running ({} symbols tracked)",
            state.orchestrator.universe().len()
        ),
        cache_status: CacheStatusBody {
            is_cached: status.is_cached,
            last_updated: status.last_updated,
            cache_age_seconds: status.age_seconds,
            cache_duration_seconds: status.lifetime_seconds,
        },
    })
}
