//! Dashboard data endpoints
//!
//! The projection layer reads dataset snapshots and derived statistics
//! here; it never holds a write path to the dataset.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use ozdash_common::events::{ReconState, SourceLabel};
use ozdash_common::model::{AggregateOp, Dataset, Series, SeriesId};

use crate::error::{ApiError, ApiResult};
use crate::recon::RefreshOutcome;
use crate::AppState;

/// Derived key metrics for the dashboard stat cards
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    /// Sum of state revenues (million AUD)
    pub total_revenue: Option<f64>,
    /// Sum of state business counts
    pub total_businesses: Option<f64>,
    /// Sum of sector employment
    pub total_employees: Option<f64>,
    /// Quarterly revenue growth, percent; `null` when undefined
    pub growth_rate_pct: Option<f64>,
}

/// Current reconciliation status and badge
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub state: ReconState,
    /// Badge classification for display
    pub source: SourceLabel,
}

/// GET /dashboard/dataset - full dataset snapshot
pub async fn get_dataset(State(state): State<AppState>) -> Json<Dataset> {
    let dataset = state.dataset.read().await.clone();
    Json(dataset)
}

/// GET /dashboard/series/{id} - one series
pub async fn get_series(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Series>> {
    let id: SeriesId = id
        .parse()
        .map_err(|_| ApiError::NotFound(format!("unknown series: {id}")))?;
    let series = state.dataset.read().await.get(id).clone();
    Ok(Json(series))
}

/// GET /dashboard/stats - derived key metrics
pub async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let dataset = state.dataset.read().await;

    Json(StatsResponse {
        total_revenue: dataset.aggregate(SeriesId::StateRevenue, AggregateOp::Sum),
        total_businesses: dataset.aggregate(SeriesId::StateBusinesses, AggregateOp::Sum),
        total_employees: dataset.aggregate(SeriesId::Employment, AggregateOp::Sum),
        growth_rate_pct: dataset.aggregate(SeriesId::QuarterlyRevenue, AggregateOp::GrowthRate),
    })
}

/// GET /dashboard/status - reconciliation state and source badge
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let recon_state = state.controller.state().await;
    Json(StatusResponse {
        state: recon_state,
        source: recon_state.source_label(),
    })
}

/// POST /dashboard/refresh - run one reconciliation cycle
///
/// Returns the terminal state; `409 Conflict` when a cycle is already in
/// flight (the request is ignored, never queued).
pub async fn refresh(State(state): State<AppState>) -> ApiResult<Json<StatusResponse>> {
    match state.controller.refresh().await {
        RefreshOutcome::Completed(recon_state) => Ok(Json(StatusResponse {
            state: recon_state,
            source: recon_state.source_label(),
        })),
        RefreshOutcome::Ignored => Err(ApiError::Conflict(
            "reconciliation already in flight".to_string(),
        )),
    }
}

/// Build dashboard routes
pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard/dataset", get(get_dataset))
        .route("/dashboard/series/:id", get(get_series))
        .route("/dashboard/stats", get(get_stats))
        .route("/dashboard/status", get(get_status))
        .route("/dashboard/refresh", post(refresh))
}
