//! Simulated variation adapter
//!
//! Never fails. Applies an independent uniform ±5% multiplicative
//! perturbation to every numeric entry of a fixed set of series, rounding
//! to the nearest integer, so the dashboard shows plausible movement when
//! no real upstream is reachable. The random source is seedable so tests
//! can assert bounded, reproducible output.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::Mutex;

use ozdash_common::events::SourceLabel;
use ozdash_common::model::{Dataset, Series, SeriesId};

use super::{AdapterError, PartialUpdate, SourceAdapter};

/// Series perturbed on each simulated refresh
const PERTURBED_SERIES: [SeriesId; 5] = [
    SeriesId::StateRevenue,
    SeriesId::Employment,
    SeriesId::QuarterlyRevenue,
    SeriesId::QuarterlyProfit,
    SeriesId::CityBusinesses,
];

/// Multiplicative variation bounds (±5%)
const VARIATION_LOW: f64 = 0.95;
const VARIATION_HIGH: f64 = 1.05;

/// Simulated variation adapter
pub struct SimulatedAdapter {
    rng: Mutex<StdRng>,
    enabled: bool,
}

impl SimulatedAdapter {
    pub fn new(enabled: bool, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
            enabled,
        }
    }
}

#[async_trait]
impl SourceAdapter for SimulatedAdapter {
    fn label(&self) -> SourceLabel {
        SourceLabel::Simulated
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    async fn fetch(&self, snapshot: &Dataset) -> Result<PartialUpdate, AdapterError> {
        let mut rng = self.rng.lock().await;
        let mut variation = move || rng.gen_range(VARIATION_LOW..VARIATION_HIGH);

        let mut update = PartialUpdate::new();
        for id in PERTURBED_SERIES {
            let perturbed = match snapshot.get(id) {
                Series::Categorical {
                    labels,
                    values,
                    colors,
                } => Series::Categorical {
                    labels: labels.clone(),
                    values: values.iter().map(|v| (v * variation()).round()).collect(),
                    colors: colors.clone(),
                },
                Series::Time { labels, values } => Series::Time {
                    labels: labels.clone(),
                    values: values
                        .iter()
                        .map(|v| v.map(|v| (v * variation()).round()))
                        .collect(),
                },
            };
            update.push(id, perturbed);
        }

        tracing::debug!(series = update.len(), "Simulated variation applied");
        Ok(update)
    }
}
