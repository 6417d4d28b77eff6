use crate::metric::{FallbackReason, Metric};
use chrono::NaiveDate;
use core_types::Trend;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// The full result of a statistics request.
///
/// This is the data transfer object handed back to callers; its JSON shape is
/// what existing consumers read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsReport {
    pub stocks: Vec<InstrumentStatistics>,
    pub correlation_matrix: Vec<CorrelationEntry>,
    pub portfolio: AggregateStatistics,
    pub data_summary: DataSummary,
}

/// Risk and return figures for one instrument. Ratios are fractional (0.08 = 8%).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentStatistics {
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    pub weight: f64,
    pub coefficient_of_variation: f64,
    pub beta: f64,
    /// Annualized mean daily return.
    pub expected_return: f64,
    /// Annualized volatility of daily returns.
    pub standard_deviation: f64,
    pub data_points: usize,
    /// Fallback branches taken while computing this row.
    #[serde(skip)]
    pub fallbacks: Vec<FallbackReason>,
}

/// Co-movement of one unordered pair of instruments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationEntry {
    #[serde(rename = "stock1")]
    pub symbol_a: String,
    #[serde(rename = "stock2")]
    pub symbol_b: String,
    pub correlation: f64,
    pub covariance: f64,
    pub data_points: usize,
    #[serde(skip)]
    pub fallbacks: Vec<FallbackReason>,
}

/// Portfolio- or list-level rollup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateStatistics {
    pub beta: f64,
    pub expected_return: f64,
    pub standard_deviation: f64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSummary {
    pub date_range: DateRange,
    /// Price points found in range, per symbol.
    pub data_points: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// One point of a price forecast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionPoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// A short-horizon linear trend forecast for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub symbol: String,
    pub predictions: Vec<PredictionPoint>,
    #[serde(rename = "lastPrice")]
    pub last_price: f64,
    pub trend: Trend,
    /// The fitted slope and the branch that produced it.
    #[serde(skip)]
    pub slope: Metric,
}
