//! Canonical dataset model
//!
//! The single mutable structure holding every chartable series. Created with
//! built-in demo defaults at startup (never empty), mutated series-by-series
//! by whichever source adapter the reconciliation controller selects, and
//! read by the projection layer (HTTP snapshot endpoints) for the life of
//! the session.
//!
//! Invariants enforced by [`Dataset::replace`]:
//! - fixed cardinality per series (all-or-nothing replacement)
//! - values non-negative and finite, except explicit absence markers in
//!   time series (which aggregates skip, never treat as zero)

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Names of every series in the canonical dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesId {
    /// Revenue by state (million AUD)
    StateRevenue,
    /// Registered business count by state
    StateBusinesses,
    /// Industry share of economy (percent)
    Industries,
    /// Quarterly revenue (million AUD)
    QuarterlyRevenue,
    /// Quarterly profit (million AUD)
    QuarterlyProfit,
    /// Employment by sector (headcount)
    Employment,
    /// Monthly revenue, 2024 (million AUD)
    MonthlyRevenue2024,
    /// Monthly revenue, 2025 (million AUD, trailing months not yet observed)
    MonthlyRevenue2025,
    /// Business count by city
    CityBusinesses,
}

impl SeriesId {
    /// All series ids, in canonical display order
    pub const ALL: [SeriesId; 9] = [
        SeriesId::StateRevenue,
        SeriesId::StateBusinesses,
        SeriesId::Industries,
        SeriesId::QuarterlyRevenue,
        SeriesId::QuarterlyProfit,
        SeriesId::Employment,
        SeriesId::MonthlyRevenue2024,
        SeriesId::MonthlyRevenue2025,
        SeriesId::CityBusinesses,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesId::StateRevenue => "state_revenue",
            SeriesId::StateBusinesses => "state_businesses",
            SeriesId::Industries => "industries",
            SeriesId::QuarterlyRevenue => "quarterly_revenue",
            SeriesId::QuarterlyProfit => "quarterly_profit",
            SeriesId::Employment => "employment",
            SeriesId::MonthlyRevenue2024 => "monthly_revenue_2024",
            SeriesId::MonthlyRevenue2025 => "monthly_revenue_2025",
            SeriesId::CityBusinesses => "city_businesses",
        }
    }
}

impl std::str::FromStr for SeriesId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SeriesId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| Error::Validation(format!("unknown series id: {s}")))
    }
}

impl std::fmt::Display for SeriesId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named series of labeled observations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Series {
    /// Ordered (label, value) pairs with optional display colors
    Categorical {
        labels: Vec<String>,
        values: Vec<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        colors: Option<Vec<String>>,
    },
    /// Ordered (period label, value-or-absent) pairs. `None` marks a period
    /// not yet observed; it is never zero.
    Time {
        labels: Vec<String>,
        values: Vec<Option<f64>>,
    },
}

impl Series {
    /// Number of labels (the fixed cardinality of the series)
    pub fn len(&self) -> usize {
        match self {
            Series::Categorical { labels, .. } | Series::Time { labels, .. } => labels.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn labels(&self) -> &[String] {
        match self {
            Series::Categorical { labels, .. } | Series::Time { labels, .. } => labels,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Series::Categorical { .. } => "categorical",
            Series::Time { .. } => "time",
        }
    }

    /// Defined (non-absent) values, in order
    pub fn defined_values(&self) -> Vec<f64> {
        match self {
            Series::Categorical { values, .. } => values.clone(),
            Series::Time { values, .. } => values.iter().filter_map(|v| *v).collect(),
        }
    }

    /// Internal-consistency check: label/value/color lengths agree, every
    /// defined value is a non-negative finite number.
    fn validate(&self, id: SeriesId) -> Result<()> {
        let bad_value = |v: f64| -> Result<()> {
            if !v.is_finite() || v < 0.0 {
                return Err(Error::Validation(format!(
                    "series {id}: value {v} is not a non-negative finite number"
                )));
            }
            Ok(())
        };

        match self {
            Series::Categorical {
                labels,
                values,
                colors,
            } => {
                if labels.len() != values.len() {
                    return Err(Error::Validation(format!(
                        "series {id}: {} labels but {} values",
                        labels.len(),
                        values.len()
                    )));
                }
                if let Some(colors) = colors {
                    if colors.len() != labels.len() {
                        return Err(Error::Validation(format!(
                            "series {id}: {} labels but {} colors",
                            labels.len(),
                            colors.len()
                        )));
                    }
                }
                for v in values {
                    bad_value(*v)?;
                }
            }
            Series::Time { labels, values } => {
                if labels.len() != values.len() {
                    return Err(Error::Validation(format!(
                        "series {id}: {} labels but {} values",
                        labels.len(),
                        values.len()
                    )));
                }
                for v in values.iter().flatten() {
                    bad_value(*v)?;
                }
            }
        }
        Ok(())
    }
}

/// Aggregate operations over a single series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateOp {
    Sum,
    Mean,
    /// `(last - first) / first * 100` over the defined values
    GrowthRate,
}

/// The canonical dataset: one field per named series.
///
/// Only the reconciliation controller holds the write path; everything else
/// reads snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub state_revenue: Series,
    pub state_businesses: Series,
    pub industries: Series,
    pub quarterly_revenue: Series,
    pub quarterly_profit: Series,
    pub employment: Series,
    pub monthly_revenue_2024: Series,
    pub monthly_revenue_2025: Series,
    pub city_businesses: Series,
}

impl Dataset {
    pub fn get(&self, id: SeriesId) -> &Series {
        match id {
            SeriesId::StateRevenue => &self.state_revenue,
            SeriesId::StateBusinesses => &self.state_businesses,
            SeriesId::Industries => &self.industries,
            SeriesId::QuarterlyRevenue => &self.quarterly_revenue,
            SeriesId::QuarterlyProfit => &self.quarterly_profit,
            SeriesId::Employment => &self.employment,
            SeriesId::MonthlyRevenue2024 => &self.monthly_revenue_2024,
            SeriesId::MonthlyRevenue2025 => &self.monthly_revenue_2025,
            SeriesId::CityBusinesses => &self.city_businesses,
        }
    }

    fn get_mut(&mut self, id: SeriesId) -> &mut Series {
        match id {
            SeriesId::StateRevenue => &mut self.state_revenue,
            SeriesId::StateBusinesses => &mut self.state_businesses,
            SeriesId::Industries => &mut self.industries,
            SeriesId::QuarterlyRevenue => &mut self.quarterly_revenue,
            SeriesId::QuarterlyProfit => &mut self.quarterly_profit,
            SeriesId::Employment => &mut self.employment,
            SeriesId::MonthlyRevenue2024 => &mut self.monthly_revenue_2024,
            SeriesId::MonthlyRevenue2025 => &mut self.monthly_revenue_2025,
            SeriesId::CityBusinesses => &mut self.city_businesses,
        }
    }

    /// Replace a series wholesale, all-or-nothing.
    ///
    /// Rejects kind mismatch, cardinality mismatch, and invalid values with
    /// [`Error::Validation`]; the prior series is untouched on rejection.
    /// Labels may be redefined (e.g. quarter labels become year labels when
    /// sourced from year-indexed data) but cardinality is fixed for life.
    pub fn replace(&mut self, id: SeriesId, new: Series) -> Result<()> {
        let current = self.get(id);
        if current.kind() != new.kind() {
            return Err(Error::Validation(format!(
                "series {id}: cannot replace {} series with {} series",
                current.kind(),
                new.kind()
            )));
        }
        if current.len() != new.len() {
            return Err(Error::Validation(format!(
                "series {id}: cardinality mismatch (have {}, got {})",
                current.len(),
                new.len()
            )));
        }
        new.validate(id)?;
        *self.get_mut(id) = new;
        Ok(())
    }

    /// Aggregate a series. Absent entries are skipped, never counted as
    /// zero; an all-absent series yields `None`. A growth rate with fewer
    /// than two defined values, or a zero first value, also yields `None`
    /// rather than propagating a divide-by-zero.
    pub fn aggregate(&self, id: SeriesId, op: AggregateOp) -> Option<f64> {
        let values = self.get(id).defined_values();
        if values.is_empty() {
            return None;
        }
        match op {
            AggregateOp::Sum => Some(values.iter().sum()),
            AggregateOp::Mean => Some(values.iter().sum::<f64>() / values.len() as f64),
            AggregateOp::GrowthRate => {
                if values.len() < 2 {
                    return None;
                }
                let first = values[0];
                let last = values[values.len() - 1];
                if first == 0.0 {
                    tracing::warn!(series = %id, "growth rate undefined: first value is zero");
                    return None;
                }
                Some((last - first) / first * 100.0)
            }
        }
    }
}

impl Default for Dataset {
    /// Built-in demo data. Also the last-known-good state on first run when
    /// every upstream source is unavailable.
    fn default() -> Self {
        let labels = |v: &[&str]| -> Vec<String> { v.iter().map(|s| s.to_string()).collect() };

        Dataset {
            state_revenue: Series::Categorical {
                labels: labels(&[
                    "New South Wales",
                    "Victoria",
                    "Queensland",
                    "Western Australia",
                    "South Australia",
                    "Tasmania",
                    "ACT",
                    "NT",
                ]),
                values: vec![485.0, 392.0, 287.0, 218.0, 125.0, 47.0, 89.0, 32.0],
                colors: None,
            },
            state_businesses: Series::Categorical {
                labels: labels(&[
                    "New South Wales",
                    "Victoria",
                    "Queensland",
                    "Western Australia",
                    "South Australia",
                    "Tasmania",
                    "ACT",
                    "NT",
                ]),
                values: vec![
                    1850.0, 1520.0, 1180.0, 890.0, 520.0, 195.0, 380.0, 145.0,
                ],
                colors: None,
            },
            industries: Series::Categorical {
                labels: labels(&[
                    "Mining & Resources",
                    "Finance & Insurance",
                    "Healthcare",
                    "Retail Trade",
                    "Manufacturing",
                    "Construction",
                    "Education",
                    "Tourism & Hospitality",
                ]),
                values: vec![22.0, 18.0, 15.0, 12.0, 11.0, 9.0, 8.0, 5.0],
                colors: Some(labels(&[
                    "#f59e0b", "#2563eb", "#10b981", "#8b5cf6", "#ef4444", "#06b6d4",
                    "#ec4899", "#14b8a6",
                ])),
            },
            quarterly_revenue: Series::Time {
                labels: labels(&["Q1 2024", "Q2 2024", "Q3 2024", "Q4 2024", "Q1 2025"]),
                values: vec![
                    Some(1245.0),
                    Some(1358.0),
                    Some(1425.0),
                    Some(1532.0),
                    Some(1675.0),
                ],
            },
            quarterly_profit: Series::Time {
                labels: labels(&["Q1 2024", "Q2 2024", "Q3 2024", "Q4 2024", "Q1 2025"]),
                values: vec![
                    Some(186.0),
                    Some(203.0),
                    Some(214.0),
                    Some(230.0),
                    Some(251.0),
                ],
            },
            employment: Series::Categorical {
                labels: labels(&[
                    "Professional Services",
                    "Retail & Hospitality",
                    "Healthcare & Social",
                    "Manufacturing",
                    "Construction",
                    "Other",
                ]),
                values: vec![
                    285000.0, 312000.0, 268000.0, 195000.0, 178000.0, 145000.0,
                ],
                colors: Some(labels(&[
                    "#3b82f6", "#10b981", "#f59e0b", "#8b5cf6", "#ef4444", "#64748b",
                ])),
            },
            monthly_revenue_2024: Series::Time {
                labels: labels(&[
                    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct",
                    "Nov", "Dec",
                ]),
                values: [
                    125.0, 118.0, 142.0, 138.0, 156.0, 148.0, 162.0, 159.0, 174.0, 168.0,
                    185.0, 178.0,
                ]
                .into_iter()
                .map(Some)
                .collect(),
            },
            monthly_revenue_2025: Series::Time {
                labels: labels(&[
                    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct",
                    "Nov", "Dec",
                ]),
                values: vec![
                    Some(142.0),
                    Some(138.0),
                    Some(155.0),
                    None,
                    None,
                    None,
                    None,
                    None,
                    None,
                    None,
                    None,
                    None,
                ],
            },
            city_businesses: Series::Categorical {
                labels: labels(&[
                    "Sydney",
                    "Melbourne",
                    "Brisbane",
                    "Perth",
                    "Adelaide",
                    "Canberra",
                    "Gold Coast",
                    "Newcastle",
                    "Hobart",
                    "Darwin",
                ]),
                values: vec![
                    2850.0, 2420.0, 1680.0, 1250.0, 780.0, 520.0, 485.0, 395.0, 285.0,
                    210.0,
                ],
                colors: Some(labels(&[
                    "#2563eb", "#10b981", "#f59e0b", "#8b5cf6", "#ef4444", "#06b6d4",
                    "#ec4899", "#14b8a6", "#f97316", "#6366f1",
                ])),
            },
        }
    }
}
