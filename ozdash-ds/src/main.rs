//! ozdash-ds - Australian business statistics data service
//!
//! Merges data from multiple unreliable upstream sources (World Bank
//! indicators, market index, simulated variation) into a single canonical
//! in-memory dataset and serves it to the browser dashboard over
//! HTTP REST + SSE.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::RwLock;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use ozdash_common::config::DashConfig;
use ozdash_common::events::EventBus;
use ozdash_common::model::Dataset;
use ozdash_ds::recon::ReconController;
use ozdash_ds::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting ozdash-ds (business statistics data service)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Optional config path as the first argument
    let config_path: Option<PathBuf> = std::env::args().nth(1).map(PathBuf::from);
    let config = DashConfig::load(config_path.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to load config: {e}"))?;
    info!(
        use_primary = config.use_primary,
        use_secondary = config.use_secondary,
        simulate = config.simulate,
        "Configuration loaded"
    );

    // Dataset starts with built-in demo data, never empty
    let dataset = Arc::new(RwLock::new(Dataset::default()));

    // Event bus for SSE broadcasting
    let event_bus = EventBus::new(100);

    let controller = Arc::new(
        ReconController::with_default_chain(&config, Arc::clone(&dataset), event_bus.clone())
            .map_err(|e| anyhow::anyhow!("Failed to build adapter chain: {e}"))?,
    );

    let state = AppState::new(dataset, Arc::clone(&controller), event_bus);
    let app = ozdash_ds::build_router(state);

    // First reconciliation runs in the background; the dashboard renders
    // demo data immediately and re-draws when real data lands.
    let startup_controller = Arc::clone(&controller);
    tokio::spawn(async move {
        let outcome = startup_controller.refresh().await;
        info!(?outcome, "Startup reconciliation finished");
    });

    let addr = format!("127.0.0.1:{}", config.listen_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}");
    info!("Health check: http://{addr}/health");

    if let Err(e) = axum::serve(listener, app).await {
        warn!("Server terminated: {e}");
    }

    Ok(())
}
