//! # Stockfolio Analytics Engine
//!
//! This crate turns closing-price history into risk and return statistics for a set of
//! holdings, and projects short-horizon price trends for a single symbol.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It depends only on `core-types`
//!   (Layer 0) and reaches price data through the `PriceHistoryStore` trait, so the
//!   database adapter lives in its own crate.
//! - **No Silent Degeneracies:** Every numeric special case (zero variance, zero total
//!   value, a flat trend) produces a `Metric::Fallback` that names the branch taken,
//!   rather than a bare number indistinguishable from a computed one.
//! - **Swappable Alignment:** Series are paired by position today. The pairing rule sits
//!   behind `SeriesAlignment` so date-based alignment can replace it without touching
//!   the calculators.
//!
//! ## Public API
//!
//! - `StatisticsAggregator`: Computes a `StatisticsReport` for a `HoldingsSnapshot`.
//! - `TrendForecaster`: Produces a `PredictionResult` for one symbol.
//! - `PriceHistoryStore` / `InMemoryPriceStore`: The price-data seam and its in-memory form.
//! - `AnalyticsError`: The specific error types that can be returned from this crate.

pub mod alignment;
pub mod beta;
pub mod covariance;
pub mod error;
pub mod forecast;
pub mod holdings;
pub mod market;
pub mod metric;
pub mod report;
pub mod returns;
pub mod statistics;
pub mod store;

pub use alignment::{PositionalAlignment, SeriesAlignment};
pub use covariance::{CovarianceEngine, CovarianceResult};
pub use error::{AnalyticsError, StoreError};
pub use forecast::{ForecastOptions, TrendForecaster};
pub use holdings::HoldingsSnapshot;
pub use market::{MarketSeries, synthesize_market_returns};
pub use metric::{FallbackReason, Metric};
pub use report::{
    AggregateStatistics, CorrelationEntry, DataSummary, DateRange, InstrumentStatistics,
    PredictionPoint, PredictionResult, StatisticsReport,
};
pub use returns::{PriceSeries, ReturnSeries};
pub use statistics::{StatisticsAggregator, StatisticsOptions};
pub use store::{InMemoryPriceStore, PriceHistoryStore};
