//! World Bank indicator adapter (primary source)
//!
//! Issues one request per economic indicator against the World Bank API,
//! concurrently with fail-fast join semantics: if any indicator request
//! fails, the whole fetch fails and nothing is updated. At the mapping
//! layer each downstream series is individually optional; a series is only
//! rewritten when its source indicator produced enough valid observations
//! (5 for time-series derivations, 1 for snapshot derivations).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use ozdash_common::config::DashConfig;
use ozdash_common::events::SourceLabel;
use ozdash_common::model::{Dataset, Series, SeriesId};

use super::{AdapterError, PartialUpdate, SourceAdapter};

const USER_AGENT: &str = "ozdash/0.1.0 (https://github.com/ozdash/ozdash)";

/// Observations needed for a time-series derivation
const MIN_TREND_OBSERVATIONS: usize = 5;
/// Baseline monthly revenue the growth trend scales (million AUD)
const BASE_MONTHLY_REVENUE: f64 = 125.0;
/// Profit assumed as a share of revenue
const PROFIT_MARGIN: f64 = 0.15;
/// Approximate share of national GDP per state, canonical state order
const STATE_GDP_SHARE: [f64; 8] = [0.31, 0.25, 0.18, 0.14, 0.08, 0.03, 0.06, 0.02];
/// Approximate share of national population per city, canonical city order
const CITY_POPULATION_SHARE: [f64; 10] = [
    0.21, 0.18, 0.12, 0.09, 0.06, 0.04, 0.035, 0.03, 0.02, 0.015,
];
/// Approximate businesses per capita
const BUSINESSES_PER_CAPITA: f64 = 0.08;

/// Economic indicators fetched per refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Indicator {
    Gdp,
    GdpGrowth,
    Unemployment,
    Population,
    Exports,
    Imports,
    Inflation,
    Manufacturing,
}

impl Indicator {
    const ALL: [Indicator; 8] = [
        Indicator::Gdp,
        Indicator::GdpGrowth,
        Indicator::Unemployment,
        Indicator::Population,
        Indicator::Exports,
        Indicator::Imports,
        Indicator::Inflation,
        Indicator::Manufacturing,
    ];

    /// World Bank indicator code
    fn code(&self) -> &'static str {
        match self {
            Indicator::Gdp => "NY.GDP.MKTP.CD",
            Indicator::GdpGrowth => "NY.GDP.MKTP.KD.ZG",
            Indicator::Unemployment => "SL.UEM.TOTL.ZS",
            Indicator::Population => "SP.POP.TOTL",
            Indicator::Exports => "NE.EXP.GNFS.ZS",
            Indicator::Imports => "NE.IMP.GNFS.ZS",
            Indicator::Inflation => "FP.CPI.TOTL.ZG",
            Indicator::Manufacturing => "NV.IND.MANF.ZS",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Indicator::Gdp => "gdp",
            Indicator::GdpGrowth => "gdp_growth",
            Indicator::Unemployment => "unemployment",
            Indicator::Population => "population",
            Indicator::Exports => "exports",
            Indicator::Imports => "imports",
            Indicator::Inflation => "inflation",
            Indicator::Manufacturing => "manufacturing",
        }
    }
}

/// One `{date, value}` observation; value is nullable upstream
#[derive(Debug, Clone, Deserialize)]
struct WbObservation {
    date: String,
    value: Option<f64>,
}

/// A valid (non-null) observation, with its year parsed for ordering
#[derive(Debug, Clone, PartialEq)]
struct ValidObservation {
    year: i32,
    value: f64,
}

type IndicatorData = HashMap<Indicator, Vec<ValidObservation>>;

/// Primary indicator adapter
pub struct WorldBankAdapter {
    http_client: reqwest::Client,
    base_url: String,
    country: String,
    lookback: String,
    per_page: u32,
    enabled: bool,
}

impl WorldBankAdapter {
    pub fn new(config: &DashConfig) -> Result<Self, AdapterError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AdapterError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.world_bank_base.clone(),
            country: config.country.clone(),
            lookback: config.lookback.clone(),
            per_page: config.per_page,
            enabled: config.use_primary,
        })
    }

    /// Fetch one indicator's observations: filter nulls, sort ascending by
    /// date. The response is a two-element array `[metadata, observations]`.
    async fn fetch_indicator(
        &self,
        indicator: Indicator,
    ) -> Result<(Indicator, Vec<ValidObservation>), AdapterError> {
        let url = format!(
            "{}/country/{}/indicator/{}?format=json&per_page={}&date={}",
            self.base_url,
            self.country,
            indicator.code(),
            self.per_page,
            self.lookback
        );

        tracing::debug!(indicator = indicator.name(), url = %url, "Querying World Bank API");

        let response = self.http_client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::Transport(format!(
                "indicator {}: HTTP {}",
                indicator.name(),
                status.as_u16()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AdapterError::Schema(e.to_string()))?;

        let raw = match body.get(1) {
            Some(serde_json::Value::Null) | None => Vec::new(),
            Some(observations) => serde_json::from_value::<Vec<WbObservation>>(
                observations.clone(),
            )
            .map_err(|e| {
                AdapterError::Schema(format!("indicator {}: {e}", indicator.name()))
            })?,
        };

        let mut valid: Vec<ValidObservation> = raw
            .into_iter()
            .filter_map(|o| {
                let value = o.value?;
                let year = o.date.parse::<i32>().ok()?;
                value.is_finite().then_some(ValidObservation { year, value })
            })
            .collect();
        valid.sort_by_key(|o| o.year);

        tracing::debug!(
            indicator = indicator.name(),
            observations = valid.len(),
            "Indicator fetched"
        );

        Ok((indicator, valid))
    }
}

#[async_trait]
impl SourceAdapter for WorldBankAdapter {
    fn label(&self) -> SourceLabel {
        SourceLabel::PrimaryApi
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    async fn fetch(&self, snapshot: &Dataset) -> Result<PartialUpdate, AdapterError> {
        // Fan out one request per indicator; first failure fails the fetch.
        let results = futures::future::try_join_all(
            Indicator::ALL.iter().map(|i| self.fetch_indicator(*i)),
        )
        .await?;

        let data: IndicatorData = results.into_iter().collect();
        let update = map_indicators(snapshot, &data);

        tracing::info!(
            series_rewritten = update.len(),
            "World Bank data fetched and mapped"
        );
        Ok(update)
    }
}

/// Latest valid observation for an indicator, if any
fn latest(data: &IndicatorData, indicator: Indicator) -> Option<f64> {
    data.get(&indicator)?.last().map(|o| o.value)
}

/// Map fetched indicators onto canonical series. Pure so tests can drive it
/// directly; each mapping below is skipped when its indicator fell short of
/// the observation threshold.
fn map_indicators(snapshot: &Dataset, data: &IndicatorData) -> PartialUpdate {
    let mut update = PartialUpdate::new();

    // Quarterly revenue/profit from the trailing 5 years of GDP. Quarter
    // labels are redefined to year labels; cardinality stays 5.
    if let Some(gdp) = data.get(&Indicator::Gdp) {
        if gdp.len() >= MIN_TREND_OBSERVATIONS {
            let recent = &gdp[gdp.len() - MIN_TREND_OBSERVATIONS..];
            let labels: Vec<String> = recent.iter().map(|o| format!("Year {}", o.year)).collect();
            let revenue: Vec<Option<f64>> = recent
                .iter()
                .map(|o| Some((o.value / 1e9).round()))
                .collect();
            let profit: Vec<Option<f64>> = revenue
                .iter()
                .map(|v| v.map(|r| (r * PROFIT_MARGIN).round()))
                .collect();

            update.push(
                SeriesId::QuarterlyRevenue,
                Series::Time {
                    labels: labels.clone(),
                    values: revenue,
                },
            );
            update.push(SeriesId::QuarterlyProfit, Series::Time { labels, values: profit });
        }
    }

    // Monthly revenue trend from the latest GDP growth rate. Absence
    // markers in the 2025 series are preserved, never filled in.
    if let Some(growth) = latest(data, Indicator::GdpGrowth) {
        let growth_factor = 1.0 + growth / 100.0;
        let monthly = |ramp_base: f64, values: &[Option<f64>]| -> Vec<Option<f64>> {
            values
                .iter()
                .enumerate()
                .map(|(idx, v)| {
                    v.map(|_| {
                        (BASE_MONTHLY_REVENUE * growth_factor * (ramp_base + idx as f64 * 0.02))
                            .round()
                            .max(0.0)
                    })
                })
                .collect()
        };

        if let Series::Time { labels, values } = snapshot.get(SeriesId::MonthlyRevenue2024) {
            update.push(
                SeriesId::MonthlyRevenue2024,
                Series::Time {
                    labels: labels.clone(),
                    values: monthly(1.0, values),
                },
            );
        }
        if let Series::Time { labels, values } = snapshot.get(SeriesId::MonthlyRevenue2025) {
            update.push(
                SeriesId::MonthlyRevenue2025,
                Series::Time {
                    labels: labels.clone(),
                    values: monthly(1.25, values),
                },
            );
        }
    }

    // Industry shares with real manufacturing and exports percentages.
    let manufacturing = latest(data, Indicator::Manufacturing);
    let exports = latest(data, Indicator::Exports);
    if manufacturing.is_some() || exports.is_some() {
        if let Series::Categorical { labels, colors, .. } = snapshot.get(SeriesId::Industries) {
            let values = vec![
                exports.unwrap_or(22.0).round().max(0.0), // Mining & Resources, tied to exports
                18.0,                                     // Finance & Insurance
                15.0,                                     // Healthcare
                12.0,                                     // Retail Trade
                manufacturing.unwrap_or(11.0).round().max(0.0),
                9.0, // Construction
                8.0, // Education
                5.0, // Tourism & Hospitality
            ];
            update.push(
                SeriesId::Industries,
                Series::Categorical {
                    labels: labels.clone(),
                    values,
                    colors: colors.clone(),
                },
            );
        }
    }

    // Employment rescaled by the real employment rate, normalized around
    // 95% employment.
    if let Some(unemployment) = latest(data, Indicator::Unemployment) {
        let scale = (100.0 - unemployment) / 95.0;
        if let Series::Categorical {
            labels,
            values,
            colors,
        } = snapshot.get(SeriesId::Employment)
        {
            update.push(
                SeriesId::Employment,
                Series::Categorical {
                    labels: labels.clone(),
                    values: values.iter().map(|v| (v * scale).round().max(0.0)).collect(),
                    colors: colors.clone(),
                },
            );
        }
    }

    // State revenue from the latest total GDP and the fixed per-state
    // distribution (billions, scaled down by 3 for chart range).
    if let Some(total_gdp) = latest(data, Indicator::Gdp) {
        if let Series::Categorical { labels, colors, .. } = snapshot.get(SeriesId::StateRevenue) {
            let values = STATE_GDP_SHARE
                .iter()
                .map(|share| (total_gdp * share / 1e9 / 3.0).round().max(0.0))
                .collect();
            update.push(
                SeriesId::StateRevenue,
                Series::Categorical {
                    labels: labels.clone(),
                    values,
                    colors: colors.clone(),
                },
            );
        }
    }

    // City business counts from the latest population figure.
    if let Some(population) = latest(data, Indicator::Population) {
        if let Series::Categorical { labels, colors, .. } = snapshot.get(SeriesId::CityBusinesses)
        {
            let values = CITY_POPULATION_SHARE
                .iter()
                .map(|share| (population * share * BUSINESSES_PER_CAPITA / 1000.0).round().max(0.0))
                .collect();
            update.push(
                SeriesId::CityBusinesses,
                Series::Categorical {
                    labels: labels.clone(),
                    values,
                    colors: colors.clone(),
                },
            );
        }
    }

    update
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(pairs: &[(i32, f64)]) -> Vec<ValidObservation> {
        pairs
            .iter()
            .map(|(year, value)| ValidObservation {
                year: *year,
                value: *value,
            })
            .collect()
    }

    #[test]
    fn gdp_trend_rewrites_quarterly_series_with_year_labels() {
        let snapshot = Dataset::default();
        let mut data = IndicatorData::new();
        data.insert(
            Indicator::Gdp,
            obs(&[
                (2019, 1.39e12),
                (2020, 1.33e12),
                (2021, 1.56e12),
                (2022, 1.69e12),
                (2023, 1.72e12),
                (2024, 1.80e12),
            ]),
        );

        let update = map_indicators(&snapshot, &data);
        let (id, series) = &update.replacements()[0];
        assert_eq!(*id, SeriesId::QuarterlyRevenue);
        assert_eq!(series.len(), 5);
        // trailing 5 years only
        assert_eq!(series.labels()[0], "Year 2020");
        assert_eq!(series.labels()[4], "Year 2024");
        // GDP converted to billions
        assert_eq!(series.defined_values()[4], 1800.0);

        let (id, profit) = &update.replacements()[1];
        assert_eq!(*id, SeriesId::QuarterlyProfit);
        assert_eq!(profit.defined_values()[4], (1800.0f64 * 0.15).round());
    }

    #[test]
    fn gdp_below_trend_threshold_leaves_quarterly_series_alone() {
        let snapshot = Dataset::default();
        let mut data = IndicatorData::new();
        data.insert(Indicator::Gdp, obs(&[(2023, 1.7e12), (2024, 1.8e12)]));

        let update = map_indicators(&snapshot, &data);
        // snapshot derivation (state revenue) still applies, trend does not
        assert!(update
            .replacements()
            .iter()
            .all(|(id, _)| *id != SeriesId::QuarterlyRevenue));
        assert!(update
            .replacements()
            .iter()
            .any(|(id, _)| *id == SeriesId::StateRevenue));
    }

    #[test]
    fn growth_trend_preserves_absence_markers() {
        let snapshot = Dataset::default();
        let mut data = IndicatorData::new();
        data.insert(Indicator::GdpGrowth, obs(&[(2023, 2.1), (2024, 3.0)]));

        let update = map_indicators(&snapshot, &data);
        let monthly_2025 = update
            .replacements()
            .iter()
            .find(|(id, _)| *id == SeriesId::MonthlyRevenue2025)
            .map(|(_, s)| s)
            .unwrap();

        let Series::Time { values, .. } = monthly_2025 else {
            panic!("expected time series");
        };
        assert!(values[0].is_some());
        assert!(values[2].is_some());
        // Apr..Dec were never observed and must stay absent
        assert!(values[3..].iter().all(|v| v.is_none()));

        // latest growth (3.0%), not the oldest, drives the factor
        let expected = (125.0f64 * 1.03 * 1.25).round();
        assert_eq!(values[0], Some(expected));
    }

    #[test]
    fn industries_use_real_percentages_with_defaults_for_missing() {
        let snapshot = Dataset::default();
        let mut data = IndicatorData::new();
        data.insert(Indicator::Exports, obs(&[(2024, 26.4)]));

        let update = map_indicators(&snapshot, &data);
        let (_, industries) = update
            .replacements()
            .iter()
            .find(|(id, _)| *id == SeriesId::Industries)
            .unwrap();

        let values = industries.defined_values();
        assert_eq!(values[0], 26.0); // exports, rounded
        assert_eq!(values[4], 11.0); // manufacturing default
        assert_eq!(values.len(), 8);
    }

    #[test]
    fn unemployment_rescales_employment_from_snapshot() {
        let snapshot = Dataset::default();
        let mut data = IndicatorData::new();
        data.insert(Indicator::Unemployment, obs(&[(2024, 5.0)]));

        let update = map_indicators(&snapshot, &data);
        let (_, employment) = update
            .replacements()
            .iter()
            .find(|(id, _)| *id == SeriesId::Employment)
            .unwrap();

        let scale = 95.0 / 95.0;
        assert_eq!(employment.defined_values()[0], (285000.0f64 * scale).round());
        assert_eq!(employment.len(), 6);
    }

    #[test]
    fn population_drives_city_business_counts() {
        let snapshot = Dataset::default();
        let mut data = IndicatorData::new();
        data.insert(Indicator::Population, obs(&[(2024, 26_000_000.0)]));

        let update = map_indicators(&snapshot, &data);
        let (_, cities) = update
            .replacements()
            .iter()
            .find(|(id, _)| *id == SeriesId::CityBusinesses)
            .unwrap();

        // Sydney: 26M * 0.21 * 0.08 / 1000
        assert_eq!(cities.defined_values()[0], (26_000_000.0f64 * 0.21 * 0.08 / 1000.0).round());
        assert_eq!(cities.len(), 10);
    }

    #[test]
    fn empty_indicator_data_maps_to_empty_update() {
        let snapshot = Dataset::default();
        let update = map_indicators(&snapshot, &IndicatorData::new());
        assert!(update.is_empty());
    }

    #[test]
    fn every_mapped_series_passes_replace_validation() {
        let mut ds = Dataset::default();
        let snapshot = ds.clone();
        let mut data = IndicatorData::new();
        data.insert(
            Indicator::Gdp,
            obs(&[
                (2020, 1.33e12),
                (2021, 1.56e12),
                (2022, 1.69e12),
                (2023, 1.72e12),
                (2024, 1.80e12),
            ]),
        );
        data.insert(Indicator::GdpGrowth, obs(&[(2024, -3.5)]));
        data.insert(Indicator::Unemployment, obs(&[(2024, 4.1)]));
        data.insert(Indicator::Population, obs(&[(2024, 26_600_000.0)]));
        data.insert(Indicator::Exports, obs(&[(2024, 24.0)]));
        data.insert(Indicator::Manufacturing, obs(&[(2024, 5.6)]));

        let update = map_indicators(&snapshot, &data);
        assert!(!update.is_empty());
        for (id, series) in update.into_replacements() {
            ds.replace(id, series).unwrap();
        }
    }
}
