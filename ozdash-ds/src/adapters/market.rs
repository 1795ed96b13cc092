//! Market index adapter (secondary source)
//!
//! Fetches a market index time series as a proxy for business activity and
//! remaps the quarterly revenue series from the trailing closes. Every
//! other series is left unchanged.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use ozdash_common::config::DashConfig;
use ozdash_common::events::SourceLabel;
use ozdash_common::model::{Dataset, Series, SeriesId};

use super::{AdapterError, PartialUpdate, SourceAdapter};

/// Closes needed to remap the quarterly revenue series
const MIN_CLOSES: usize = 5;
/// Index points to million AUD of business revenue
const REVENUE_SCALE: f64 = 0.02;

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[allow(dead_code)]
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    close: Vec<Option<f64>>,
}

/// Secondary market adapter
pub struct MarketAdapter {
    http_client: reqwest::Client,
    base_url: String,
    symbol: String,
    enabled: bool,
}

impl MarketAdapter {
    pub fn new(config: &DashConfig) -> Result<Self, AdapterError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AdapterError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.market_base.clone(),
            symbol: config.market_symbol.clone(),
            enabled: config.use_secondary,
        })
    }
}

#[async_trait]
impl SourceAdapter for MarketAdapter {
    fn label(&self) -> SourceLabel {
        SourceLabel::SecondaryApi
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    async fn fetch(&self, snapshot: &Dataset) -> Result<PartialUpdate, AdapterError> {
        let url = format!(
            "{}/v8/finance/chart/{}?interval=1mo&range=1y",
            self.base_url, self.symbol
        );

        tracing::debug!(symbol = %self.symbol, url = %url, "Querying market API");

        let response = self.http_client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::Transport(format!(
                "market chart: HTTP {}",
                status.as_u16()
            )));
        }

        let body: ChartResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::Schema(e.to_string()))?;

        let result = body
            .chart
            .result
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
            .ok_or_else(|| AdapterError::Schema("chart result missing".into()))?;

        let quote = result
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| AdapterError::Schema("quote data missing".into()))?;

        // Null closes (untraded periods) are dropped before the threshold
        // check so the canonical non-negative-finite invariant holds.
        let closes: Vec<f64> = quote
            .close
            .into_iter()
            .flatten()
            .filter(|c| c.is_finite() && *c >= 0.0)
            .collect();

        if closes.len() < MIN_CLOSES {
            return Err(AdapterError::Schema(format!(
                "need at least {MIN_CLOSES} closes, got {}",
                closes.len()
            )));
        }

        let recent = &closes[closes.len() - MIN_CLOSES..];
        let labels = snapshot.get(SeriesId::QuarterlyRevenue).labels().to_vec();
        let values: Vec<Option<f64>> = recent
            .iter()
            .map(|close| Some((close * REVENUE_SCALE).round()))
            .collect();

        tracing::info!(
            symbol = %self.symbol,
            closes = closes.len(),
            "Market data fetched, quarterly revenue remapped"
        );

        let mut update = PartialUpdate::new();
        update.push(SeriesId::QuarterlyRevenue, Series::Time { labels, values });
        Ok(update)
    }
}
