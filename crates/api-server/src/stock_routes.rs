//! Stock API Routes
//!
//! Cached fundamental metrics for the whole portfolio, and live prices.

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use portfolio_core::{PriceEntry, StockResult};
use serde::Serialize;

use crate::{ApiResponse, AppError, AppState};

#[derive(Serialize)]
pub struct StocksPayload {
    pub total_stocks: usize,
    pub cached: bool,
    pub cache_expires_in: Option<u64>,
    pub last_updated: Option<DateTime<Utc>>,
    pub data: Vec<StockResult>,
}

#[derive(Serialize)]
pub struct PricesPayload {
    pub total_stocks: usize,
    pub data: Vec<PriceEntry>,
}

pub fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/api/stocks", get(get_stocks))
        .route("/api/prices", get(get_prices))
}

async fn get_stocks(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<StocksPayload>>, AppError> {
    let read = state.orchestrator.stock_details().await?;

    Ok(Json(ApiResponse::success(StocksPayload {
        total_stocks: read.snapshot.len(),
        cached: read.cached,
        cache_expires_in: Some(read.expires_in.as_secs()),
        last_updated: Some(read.snapshot.produced_at),
        data: read.snapshot.entries.clone(),
    })))
}

async fn get_prices(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<PricesPayload>>, AppError> {
    let prices = state.orchestrator.current_prices().await;

    Ok(Json(ApiResponse::success(PricesPayload {
        total_stocks: prices.len(),
        data: prices,
    })))
}
