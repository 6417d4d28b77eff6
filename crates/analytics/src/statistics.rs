use crate::alignment::{PositionalAlignment, SeriesAlignment};
use crate::beta::beta;
use crate::covariance::{CovarianceEngine, sample_variance};
use crate::error::AnalyticsError;
use crate::holdings::HoldingsSnapshot;
use crate::market::synthesize_market_returns;
use crate::metric::{FallbackReason, Metric, round_dp};
use crate::report::{
    AggregateStatistics, CorrelationEntry, DataSummary, DateRange, InstrumentStatistics,
    StatisticsReport,
};
use crate::returns::{PriceSeries, ReturnSeries};
use crate::store::PriceHistoryStore;
use chrono::NaiveDate;
use futures::future::try_join_all;
use rust_decimal::RoundingStrategy;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Decimal places kept for every ratio leaving the engine.
const RATIO_DECIMALS: i32 = 6;
/// Decimal places kept for the total value.
const VALUE_DECIMALS: u32 = 2;

#[derive(Debug, Clone, Copy)]
pub struct StatisticsOptions {
    /// Annualization factor for daily figures.
    pub trading_days_per_year: u32,
}

impl Default for StatisticsOptions {
    fn default() -> Self {
        Self {
            trading_days_per_year: 252,
        }
    }
}

/// Computes per-instrument, pairwise and aggregate risk/return statistics for a set of holdings.
pub struct StatisticsAggregator {
    store: Arc<dyn PriceHistoryStore>,
    alignment: Arc<dyn SeriesAlignment>,
    options: StatisticsOptions,
}

/// Everything derived for one holding before rounding.
struct InstrumentFigures {
    weight: Metric,
    beta: Metric,
    expected_return: f64,
    standard_deviation: f64,
    coefficient_of_variation: Metric,
    variance: Metric,
}

impl StatisticsAggregator {
    /// Creates an aggregator that pairs series by position.
    pub fn new(store: Arc<dyn PriceHistoryStore>, options: StatisticsOptions) -> Self {
        Self::with_alignment(store, Arc::new(PositionalAlignment), options)
    }

    pub fn with_alignment(
        store: Arc<dyn PriceHistoryStore>,
        alignment: Arc<dyn SeriesAlignment>,
        options: StatisticsOptions,
    ) -> Self {
        Self {
            store,
            alignment,
            options,
        }
    }

    /// The main entry point for computing statistics over a date range.
    ///
    /// # Arguments
    ///
    /// * `holdings` - The frozen set of instruments and their live valuations.
    /// * `start_date`, `end_date` - Inclusive bounds of the price history to analyse.
    ///
    /// # Returns
    ///
    /// The `StatisticsReport`, or `InsufficientData` when any symbol has fewer than two
    /// prices in range. Numeric degeneracies never fail; they take documented fallbacks.
    pub async fn compute_statistics(
        &self,
        holdings: &HoldingsSnapshot,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<StatisticsReport, AnalyticsError> {
        if start_date > end_date {
            return Err(AnalyticsError::InvalidInput(format!(
                "start date {start_date} is after end date {end_date}"
            )));
        }

        // 1. Fetch every symbol's history concurrently.
        let histories = try_join_all(
            holdings
                .symbols()
                .map(|symbol| self.store.get_prices(symbol, start_date, end_date)),
        )
        .await?;

        let counts: BTreeMap<String, usize> = holdings
            .symbols()
            .zip(&histories)
            .map(|(symbol, points)| (symbol.to_string(), points.len()))
            .collect();
        for (symbol, count) in &counts {
            debug!(symbol = %symbol, points = count, "Fetched price history.");
        }
        if counts.values().any(|&count| count < 2) {
            warn!(?counts, "Insufficient price history for statistics.");
            return Err(AnalyticsError::InsufficientData { counts });
        }

        // 2. Daily returns, in holdings order.
        let returns = holdings
            .symbols()
            .zip(&histories)
            .map(|(symbol, points)| PriceSeries::new(symbol, points)?.returns())
            .collect::<Result<Vec<ReturnSeries>, _>>()?;

        // 3. Value weights.
        let total_value = holdings.total_value();
        let weights = holdings.weights()?;

        // 4. The synthesized market.
        let weight_map: HashMap<String, f64> = holdings
            .symbols()
            .zip(&weights)
            .map(|(symbol, weight)| (symbol.to_string(), weight.value()))
            .collect();
        let instruments: Vec<(&str, &ReturnSeries)> = holdings.symbols().zip(&returns).collect();
        let market = synthesize_market_returns(self.alignment.as_ref(), &instruments, &weight_map);

        // 5. Per-instrument figures.
        let figures: Vec<InstrumentFigures> = returns
            .iter()
            .zip(&weights)
            .map(|(series, weight)| self.instrument_figures(series, *weight, &market.returns))
            .collect();

        // 6. Aggregates over the covariance matrix.
        let covariances = CovarianceEngine::new(self.alignment.as_ref());
        let portfolio_beta: f64 = figures.iter().map(|f| f.weight.value() * f.beta.value()).sum();
        let portfolio_expected_return: f64 = figures
            .iter()
            .map(|f| f.weight.value() * f.expected_return)
            .sum();
        let mut portfolio_variance = 0.0;
        for (i, returns_i) in returns.iter().enumerate() {
            for (j, returns_j) in returns.iter().enumerate() {
                let covariance = covariances
                    .covariance_and_correlation(returns_i, returns_j)
                    .covariance
                    .value();
                portfolio_variance += weights[i].value() * weights[j].value() * covariance;
            }
        }
        let portfolio_standard_deviation =
            (portfolio_variance * self.trading_days()).sqrt();

        // 7. Pairwise correlation matrix, each unordered pair once.
        let symbols: Vec<&str> = holdings.symbols().collect();
        let mut correlation_matrix = Vec::new();
        for i in 0..symbols.len() {
            for j in (i + 1)..symbols.len() {
                let result = covariances.covariance_and_correlation(&returns[i], &returns[j]);
                correlation_matrix.push(CorrelationEntry {
                    symbol_a: symbols[i].to_string(),
                    symbol_b: symbols[j].to_string(),
                    correlation: round_dp(result.correlation.value(), RATIO_DECIMALS),
                    covariance: round_dp(result.covariance.value(), RATIO_DECIMALS),
                    data_points: counts[symbols[i]].min(counts[symbols[j]]),
                    fallbacks: [result.correlation, result.covariance]
                        .iter()
                        .filter_map(Metric::fallback_reason)
                        .collect(),
                });
            }
        }

        let stocks = holdings
            .iter()
            .zip(figures)
            .map(|(holding, f)| InstrumentStatistics {
                symbol: holding.symbol.clone(),
                company_name: holding.company_name.clone(),
                weight: f.weight.value(),
                coefficient_of_variation: round_dp(f.coefficient_of_variation.value(), RATIO_DECIMALS),
                beta: round_dp(f.beta.value(), RATIO_DECIMALS),
                expected_return: round_dp(f.expected_return, RATIO_DECIMALS),
                standard_deviation: round_dp(f.standard_deviation, RATIO_DECIMALS),
                data_points: counts[holding.symbol.as_str()],
                fallbacks: [f.weight, f.variance, f.coefficient_of_variation, f.beta]
                    .iter()
                    .filter_map(Metric::fallback_reason)
                    .collect(),
            })
            .collect();

        info!(
            instruments = holdings.len(),
            pairs = correlation_matrix.len(),
            market_points = market.returns.len(),
            %start_date,
            %end_date,
            "Statistics computed."
        );

        Ok(StatisticsReport {
            stocks,
            correlation_matrix,
            portfolio: AggregateStatistics {
                beta: round_dp(portfolio_beta, RATIO_DECIMALS),
                expected_return: round_dp(portfolio_expected_return, RATIO_DECIMALS),
                standard_deviation: round_dp(portfolio_standard_deviation, RATIO_DECIMALS),
                total_value: total_value
                    .round_dp_with_strategy(VALUE_DECIMALS, RoundingStrategy::MidpointAwayFromZero),
            },
            data_summary: DataSummary {
                date_range: DateRange {
                    start: start_date,
                    end: end_date,
                },
                data_points: counts,
            },
        })
    }

    fn trading_days(&self) -> f64 {
        f64::from(self.options.trading_days_per_year)
    }

    fn instrument_figures(
        &self,
        returns: &ReturnSeries,
        weight: Metric,
        market: &ReturnSeries,
    ) -> InstrumentFigures {
        let mean = returns.mean();
        let variance = sample_variance(returns.values());
        let stddev = variance.value().sqrt();

        // A zero mean is replaced by 1.0 as the divisor, not by an epsilon.
        let coefficient_of_variation = if mean == 0.0 {
            Metric::fallback(FallbackReason::ZeroMean, stddev)
        } else {
            Metric::Computed(stddev / mean.abs())
        };

        InstrumentFigures {
            weight,
            beta: beta(self.alignment.as_ref(), returns, market),
            expected_return: mean * self.trading_days(),
            standard_deviation: stddev * self.trading_days().sqrt(),
            coefficient_of_variation,
            variance,
        }
    }
}
