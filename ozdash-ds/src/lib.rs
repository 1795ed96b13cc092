//! ozdash-ds library interface
//!
//! Exposes the reconciliation core and HTTP surface for integration testing.

pub mod adapters;
pub mod api;
pub mod error;
pub mod recon;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use ozdash_common::events::EventBus;
use ozdash_common::model::Dataset;

use crate::recon::ReconController;

/// Application state shared across handlers
///
/// The controller holds the only write path to the dataset; handlers read
/// snapshots through the shared lock.
#[derive(Clone)]
pub struct AppState {
    /// Canonical dataset (read access for handlers)
    pub dataset: Arc<RwLock<Dataset>>,
    /// Reconciliation controller
    pub controller: Arc<ReconController>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        dataset: Arc<RwLock<Dataset>>,
        controller: Arc<ReconController>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            dataset,
            controller,
            event_bus,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::dashboard_routes())
        .merge(api::health_routes())
        .route("/events", get(api::event_stream))
        .with_state(state)
}
