//! Event types for the ozdash notification contract
//!
//! The reconciliation controller emits a [`DashEvent`] synchronously after
//! each successful series mutation and after each state transition, so the
//! projection layer (browser dashboard over SSE) can re-draw incrementally
//! or in bulk. Events are broadcast via [`EventBus`] and serialized for SSE
//! transmission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::model::SeriesId;

/// Which source populated the dataset, for the dashboard badge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceLabel {
    /// World Bank indicator API
    PrimaryApi,
    /// Market index API
    SecondaryApi,
    /// Simulated variation of the current data
    Simulated,
    /// Built-in demo data (last-known-good)
    Demo,
    /// A reconciliation cycle is in flight
    Loading,
}

impl SourceLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceLabel::PrimaryApi => "PrimaryAPI",
            SourceLabel::SecondaryApi => "SecondaryAPI",
            SourceLabel::Simulated => "Simulated",
            SourceLabel::Demo => "Demo",
            SourceLabel::Loading => "Loading",
        }
    }
}

impl std::fmt::Display for SourceLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reconciliation state machine: `Idle → Loading → Succeeded | Exhausted`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ReconState {
    /// No reconciliation has run yet
    Idle,
    /// A refresh is attempting the adapter chain
    Loading,
    /// An adapter populated the dataset
    Succeeded { source: SourceLabel },
    /// Every adapter failed or was disabled; dataset is last-known-good
    Exhausted,
}

impl ReconState {
    /// Badge text classification for the dashboard
    pub fn source_label(&self) -> SourceLabel {
        match self {
            ReconState::Idle | ReconState::Exhausted => SourceLabel::Demo,
            ReconState::Loading => SourceLabel::Loading,
            ReconState::Succeeded { source } => *source,
        }
    }
}

/// ozdash event types
///
/// Shared between the reconciliation core (producer) and the SSE endpoint
/// (consumer). All events carry the id of the physical refresh cycle that
/// produced them, so a client can correlate incremental series updates with
/// the terminal state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DashEvent {
    /// A series was replaced with fresh data
    ///
    /// Emitted synchronously after each successful `Dataset::replace`.
    SeriesReplaced {
        /// Which series changed
        series: SeriesId,
        /// Which source produced the new data
        source: SourceLabel,
        /// Refresh cycle that performed the mutation
        refresh_id: Uuid,
        /// When the mutation was committed
        timestamp: DateTime<Utc>,
    },

    /// The reconciliation state machine transitioned
    ReconStateChanged {
        /// State after the transition
        state: ReconState,
        /// Badge classification of that state
        source: SourceLabel,
        /// Refresh cycle that transitioned (absent for startup Idle)
        refresh_id: Option<Uuid>,
        /// When the transition happened
        timestamp: DateTime<Utc>,
    },

    /// Non-fatal notice that the dashboard is showing demo data
    ///
    /// Emitted on exhaustion; informational only, never an error.
    DemoDataNotice {
        message: String,
        refresh_id: Uuid,
        timestamp: DateTime<Utc>,
    },
}

impl DashEvent {
    /// SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            DashEvent::SeriesReplaced { .. } => "SeriesReplaced",
            DashEvent::ReconStateChanged { .. } => "ReconStateChanged",
            DashEvent::DemoDataNotice { .. } => "DemoDataNotice",
        }
    }
}

/// Broadcast bus for [`DashEvent`]s
///
/// Thin wrapper over `tokio::sync::broadcast`; cloning shares the channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DashEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per lagging subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<DashEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers, returning how many received it.
    ///
    /// Emission never fails: with no subscribers the event is simply
    /// dropped, so the reconciliation core never blocks on listeners.
    pub fn emit(&self, event: DashEvent) -> usize {
        match self.tx.send(event) {
            Ok(count) => count,
            Err(_) => 0,
        }
    }
}
