//! Reconciliation controller
//!
//! Owns the write path to the canonical dataset. On each refresh it walks
//! the adapter chain in fixed priority order (primary → secondary →
//! simulated), applies the first successful adapter's update, and falls
//! back to last-known-good data when the chain is exhausted. Failures from
//! non-selected adapters are logged and swallowed: a single upstream outage
//! must never block the dashboard.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use ozdash_common::config::DashConfig;
use ozdash_common::events::{DashEvent, EventBus, ReconState, SourceLabel};
use ozdash_common::model::Dataset;

use crate::adapters::{
    AdapterError, MarketAdapter, PartialUpdate, SimulatedAdapter, SourceAdapter, WorldBankAdapter,
};

/// What a call to [`ReconController::refresh`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The chain ran to a terminal state
    Completed(ReconState),
    /// A reconciliation was already in flight; this request was a no-op
    Ignored,
}

/// Reconciliation controller: `Idle → Loading → Succeeded | Exhausted`
///
/// Cloning shares every handle, like [`EventBus`]: all clones see the same
/// dataset, state, and in-flight gate.
#[derive(Clone)]
pub struct ReconController {
    dataset: Arc<RwLock<Dataset>>,
    adapters: Vec<Arc<dyn SourceAdapter>>,
    event_bus: EventBus,
    state: Arc<RwLock<ReconState>>,
    // re-entrancy gate: at most one reconciliation in flight
    in_flight: Arc<AtomicBool>,
}

/// Releases the in-flight gate when the cycle ends, however it ends
struct GateRelease(Arc<AtomicBool>);

impl Drop for GateRelease {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ReconController {
    pub fn new(
        dataset: Arc<RwLock<Dataset>>,
        adapters: Vec<Arc<dyn SourceAdapter>>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            dataset,
            adapters,
            event_bus,
            state: Arc::new(RwLock::new(ReconState::Idle)),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Build the controller with the standard adapter chain from config
    pub fn with_default_chain(
        config: &DashConfig,
        dataset: Arc<RwLock<Dataset>>,
        event_bus: EventBus,
    ) -> Result<Self, AdapterError> {
        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
            Arc::new(WorldBankAdapter::new(config)?),
            Arc::new(MarketAdapter::new(config)?),
            Arc::new(SimulatedAdapter::new(config.simulate, config.simulation_seed)),
        ];
        Ok(Self::new(dataset, adapters, event_bus))
    }

    /// Current state of the machine
    pub async fn state(&self) -> ReconState {
        *self.state.read().await
    }

    /// Current badge classification
    pub async fn source_label(&self) -> SourceLabel {
        self.state().await.source_label()
    }

    /// Run one reconciliation cycle.
    ///
    /// A refresh arriving while another is `Loading` is ignored, not queued:
    /// exactly one terminal transition happens per physical refresh. The
    /// call itself never fails; exhaustion is reported as a state, not an
    /// error.
    ///
    /// The adapter chain runs on a detached task that this call merely
    /// awaits: a caller that goes away mid-fetch (a dropped HTTP handler)
    /// cannot cancel the cycle, so every started refresh still reaches a
    /// terminal state and releases the gate.
    pub async fn refresh(&self) -> RefreshOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::info!("Refresh ignored: reconciliation already in flight");
            return RefreshOutcome::Ignored;
        }

        let runner = self.clone();
        let cycle = tokio::spawn(async move {
            let _gate = GateRelease(Arc::clone(&runner.in_flight));
            runner.run_cycle().await
        });

        match cycle.await {
            Ok(terminal) => RefreshOutcome::Completed(terminal),
            Err(e) => {
                // adapter panic; the gate was released by the drop guard
                tracing::error!(error = %e, "Reconciliation task failed");
                RefreshOutcome::Completed(self.state().await)
            }
        }
    }

    /// Walk the adapter chain once and land on a terminal state
    async fn run_cycle(&self) -> ReconState {
        let refresh_id = Uuid::new_v4();
        tracing::info!(refresh_id = %refresh_id, "Reconciliation started");
        self.transition(ReconState::Loading, Some(refresh_id)).await;

        let mut terminal = ReconState::Exhausted;
        for adapter in &self.adapters {
            let source = adapter.label();
            if !adapter.enabled() {
                tracing::debug!(source = %source, "Adapter disabled, skipping");
                continue;
            }

            let snapshot = self.dataset.read().await.clone();
            match adapter.fetch(&snapshot).await {
                Ok(update) => {
                    let applied = self.apply(update, source, refresh_id).await;
                    tracing::info!(
                        refresh_id = %refresh_id,
                        source = %source,
                        series_replaced = applied,
                        "Reconciliation succeeded"
                    );
                    terminal = ReconState::Succeeded { source };
                    break;
                }
                Err(e) => {
                    // Deliberately swallowed: fall through to the next source.
                    tracing::warn!(source = %source, error = %e, "Adapter failed, falling back");
                }
            }
        }

        if terminal == ReconState::Exhausted {
            tracing::warn!(
                refresh_id = %refresh_id,
                "All data sources exhausted, keeping last-known-good data"
            );
            self.event_bus.emit(DashEvent::DemoDataNotice {
                message: "Using demo Australian business data.".to_string(),
                refresh_id,
                timestamp: Utc::now(),
            });
        }

        self.transition(terminal, Some(refresh_id)).await;
        terminal
    }

    /// Apply one adapter's update, series by series. A validation rejection
    /// aborts only that series; the rest of the update still lands.
    async fn apply(&self, update: PartialUpdate, source: SourceLabel, refresh_id: Uuid) -> usize {
        let mut dataset = self.dataset.write().await;
        let mut applied = 0;

        for (id, series) in update.into_replacements() {
            match dataset.replace(id, series) {
                Ok(()) => {
                    applied += 1;
                    self.event_bus.emit(DashEvent::SeriesReplaced {
                        series: id,
                        source,
                        refresh_id,
                        timestamp: Utc::now(),
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        series = %id,
                        source = %source,
                        error = %e,
                        "Series update rejected, keeping prior data"
                    );
                }
            }
        }

        applied
    }

    async fn transition(&self, new_state: ReconState, refresh_id: Option<Uuid>) {
        {
            let mut state = self.state.write().await;
            *state = new_state;
        }
        tracing::info!(state = ?new_state, "Reconciliation state changed");
        self.event_bus.emit(DashEvent::ReconStateChanged {
            state: new_state,
            source: new_state.source_label(),
            refresh_id,
            timestamp: Utc::now(),
        });
    }
}
