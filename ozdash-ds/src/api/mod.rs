//! HTTP API for the projection layer
//!
//! REST endpoints serving dataset snapshots and derived statistics, plus an
//! SSE stream of reconciliation events so the dashboard can re-draw
//! incrementally.

mod dashboard;
mod health;
mod sse;

pub use dashboard::dashboard_routes;
pub use health::health_routes;
pub use sse::event_stream;
