//! Source adapters
//!
//! Each adapter knows how to turn one upstream source's payload into
//! full-series replacements for the canonical dataset. Adapters never write
//! the dataset themselves; they produce a [`PartialUpdate`] that the
//! reconciliation controller applies, so a failed fetch can never leave a
//! half-written series behind.

mod market;
mod simulated;
mod world_bank;

pub use market::MarketAdapter;
pub use simulated::SimulatedAdapter;
pub use world_bank::WorldBankAdapter;

use async_trait::async_trait;
use thiserror::Error;

use ozdash_common::events::SourceLabel;
use ozdash_common::model::{Dataset, Series, SeriesId};

/// Adapter-boundary errors. Both variants are swallowed by the controller:
/// an upstream outage degrades to the next source, never to the caller.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Network or HTTP failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Upstream responded with an unexpected or missing shape
    #[error("Schema error: {0}")]
    Schema(String),
}

impl From<reqwest::Error> for AdapterError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            AdapterError::Schema(e.to_string())
        } else {
            AdapterError::Transport(e.to_string())
        }
    }
}

/// An ordered batch of full-series replacements produced by one fetch
#[derive(Debug, Default)]
pub struct PartialUpdate {
    replacements: Vec<(SeriesId, Series)>,
}

impl PartialUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: SeriesId, series: Series) {
        self.replacements.push((id, series));
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.replacements.len()
    }

    pub fn into_replacements(self) -> Vec<(SeriesId, Series)> {
        self.replacements
    }

    pub fn replacements(&self) -> &[(SeriesId, Series)] {
        &self.replacements
    }
}

/// A pluggable strategy that attempts to populate part or all of the
/// dataset from one upstream source.
///
/// `fetch` receives a read-only snapshot of the current dataset: adapters
/// that derive new values from current ones (growth scaling, perturbation)
/// read from it, and every replacement must preserve the snapshot's
/// per-series cardinality.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Badge label identifying this source
    fn label(&self) -> SourceLabel;

    /// Disabled adapters are skipped by the controller, like a failure
    fn enabled(&self) -> bool {
        true
    }

    async fn fetch(&self, snapshot: &Dataset) -> Result<PartialUpdate, AdapterError>;
}
