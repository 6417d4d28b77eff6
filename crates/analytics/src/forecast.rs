use crate::error::AnalyticsError;
use crate::metric::{FallbackReason, Metric};
use crate::report::{PredictionPoint, PredictionResult};
use crate::returns::{PriceSeries, mean};
use crate::store::PriceHistoryStore;
use chrono::Days;
use core_types::{PricePoint, Trend};
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info};

/// The first forward day that gets a prediction; days 1 and 2 are never emitted.
const FIRST_FORECAST_DAY: u32 = 3;
/// Amplitude of the slope noise used when no usable trend can be fitted.
const NOISE_SCALE: f64 = 0.1;

#[derive(Debug, Clone, Copy)]
pub struct ForecastOptions {
    /// How many of the most recent closes are fetched.
    pub lookback: usize,
    /// Horizon used when the caller passes none, or 0.
    pub default_horizon_days: u32,
}

impl Default for ForecastOptions {
    fn default() -> Self {
        Self {
            lookback: 30,
            default_horizon_days: 7,
        }
    }
}

/// Projects a symbol's recent closes forward along a least-squares line.
pub struct TrendForecaster {
    store: Arc<dyn PriceHistoryStore>,
    options: ForecastOptions,
}

impl TrendForecaster {
    pub fn new(store: Arc<dyn PriceHistoryStore>, options: ForecastOptions) -> Self {
        Self { store, options }
    }

    /// Resolves the requested horizon; `None` and `Some(0)` mean the default.
    pub fn horizon(&self, requested: Option<u32>) -> u32 {
        match requested {
            Some(days) if days > 0 => days,
            _ => self.options.default_horizon_days,
        }
    }

    /// Forecasts `symbol` over `horizon_days`, drawing fallback noise from the thread RNG.
    pub async fn predict(
        &self,
        symbol: &str,
        horizon_days: Option<u32>,
    ) -> Result<PredictionResult, AnalyticsError> {
        let history = self.recent_history(symbol).await?;
        let mut rng = rand::thread_rng();
        project(symbol, &history, self.horizon(horizon_days), &mut rng)
    }

    /// Same as [`predict`](Self::predict) with a caller-supplied RNG.
    pub async fn predict_with_rng<R: Rng + Send>(
        &self,
        symbol: &str,
        horizon_days: Option<u32>,
        rng: &mut R,
    ) -> Result<PredictionResult, AnalyticsError> {
        let history = self.recent_history(symbol).await?;
        project(symbol, &history, self.horizon(horizon_days), rng)
    }

    /// The most recent closes in chronological order; `NotFound` when there are none.
    async fn recent_history(&self, symbol: &str) -> Result<Vec<PricePoint>, AnalyticsError> {
        let mut history = self
            .store
            .get_recent_prices(symbol, self.options.lookback)
            .await?;
        if history.is_empty() {
            return Err(AnalyticsError::NotFound(symbol.to_string()));
        }
        history.reverse();
        debug!(symbol, points = history.len(), "Fetched recent closes.");
        Ok(history)
    }
}

/// Least-squares slope of the first `min(horizon, len)` prices against their index.
///
/// A single-point window, a non-finite slope, or a window of identical prices all fall
/// back to a small random slope in `[-0.05, 0.05)`. Any other window keeps its fitted
/// slope, even when that slope is exactly zero.
pub fn fit_slope<R: Rng>(prices: &[f64], horizon_days: u32, rng: &mut R) -> Metric {
    let n = (horizon_days as usize).min(prices.len());
    let window = &prices[..n];
    let x_mean = (n as f64 - 1.0) / 2.0;
    let y_mean = mean(window);

    let (numerator, denominator) = window
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(num, den), (i, price)| {
            let dx = i as f64 - x_mean;
            (num + dx * (price - y_mean), den + dx * dx)
        });

    let noise = |rng: &mut R| (rng.r#gen::<f64>() - 0.5) * NOISE_SCALE;
    if denominator == 0.0 {
        return Metric::fallback(FallbackReason::ZeroDenominator, noise(rng));
    }
    let slope = numerator / denominator;
    if !slope.is_finite() {
        Metric::fallback(FallbackReason::NonFiniteSlope, noise(rng))
    } else if window.iter().all(|price| *price == window[0]) {
        Metric::fallback(FallbackReason::FlatTrend, noise(rng))
    } else {
        Metric::Computed(slope)
    }
}

/// Builds the forecast from chronological `history` (non-empty).
///
/// The most recent close is emitted first at its own date. Projections then start at
/// day 3 after it and run through `horizon_days`, never going below 0. A horizon whose
/// last day falls past the calendar's end is rejected.
pub fn project<R: Rng>(
    symbol: &str,
    history: &[PricePoint],
    horizon_days: u32,
    rng: &mut R,
) -> Result<PredictionResult, AnalyticsError> {
    let series = PriceSeries::new(symbol, history)?;
    let (Some(last), Some(&last_price)) = (history.last(), series.closes().last()) else {
        return Err(AnalyticsError::NotFound(symbol.to_string()));
    };

    let offset_date = |day: u32| {
        last.date.checked_add_days(Days::new(u64::from(day))).ok_or_else(|| {
            AnalyticsError::InvalidInput(format!(
                "a {day}-day horizon from {} is past the last representable date",
                last.date
            ))
        })
    };
    // Checked before anything is allocated for the projection.
    offset_date(horizon_days)?;

    let slope = fit_slope(series.closes(), horizon_days, rng);

    let mut predictions = vec![PredictionPoint {
        date: last.date,
        price: last_price,
    }];
    for day in FIRST_FORECAST_DAY..=horizon_days {
        let offset = f64::from(day);
        predictions.push(PredictionPoint {
            date: offset_date(day)?,
            price: (last_price + slope.value() * offset).max(0.0),
        });
    }

    let trend = Trend::from_slope(slope.value());
    info!(
        symbol,
        horizon_days,
        slope = slope.value(),
        fallback = slope.is_fallback(),
        ?trend,
        "Prediction generated."
    );

    Ok(PredictionResult {
        symbol: symbol.to_string(),
        predictions,
        last_price,
        trend,
        slope,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryPriceStore;
    use approx::assert_abs_diff_eq;
    use chrono::{Duration, NaiveDate};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rust_decimal::Decimal;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
    }

    fn history(closes: &[i64]) -> Vec<PricePoint> {
        closes
            .iter()
            .enumerate()
            .map(|(i, c)| PricePoint::new(day(1) + Duration::days(i as i64), Decimal::from(*c)))
            .collect()
    }

    fn forecaster(symbol: &str, closes: &[i64]) -> TrendForecaster {
        let mut store = InMemoryPriceStore::new();
        for point in history(closes) {
            store.insert(symbol, point.date, point.close_price);
        }
        TrendForecaster::new(Arc::new(store), ForecastOptions::default())
    }

    #[test]
    fn rising_prices_fit_positive_slope() {
        let mut rng = StdRng::seed_from_u64(7);
        let slope = fit_slope(&[10.0, 11.0, 12.0, 13.0, 14.0], 7, &mut rng);
        assert_eq!(slope, Metric::Computed(1.0));
    }

    #[test]
    fn window_is_limited_by_horizon() {
        let mut rng = StdRng::seed_from_u64(7);
        // Only the first three prices enter the fit.
        let slope = fit_slope(&[10.0, 12.0, 14.0, 0.0, 0.0], 3, &mut rng);
        assert_abs_diff_eq!(slope.value(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn single_point_window_uses_noise() {
        let mut rng = StdRng::seed_from_u64(11);
        let slope = fit_slope(&[42.0, 43.0], 1, &mut rng);
        assert_eq!(slope.fallback_reason(), Some(FallbackReason::ZeroDenominator));
        assert!((-0.05..=0.05).contains(&slope.value()));
    }

    #[test]
    fn flat_prices_use_noise() {
        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let slope = fit_slope(&[50.0; 5], 7, &mut rng);
            assert_eq!(slope.fallback_reason(), Some(FallbackReason::FlatTrend));
            assert!(slope.value().is_finite());
            assert!((-0.05..=0.05).contains(&slope.value()));
        }
    }

    #[test]
    fn symmetric_window_keeps_its_zero_slope() {
        let mut rng = StdRng::seed_from_u64(4);
        let slope = fit_slope(&[10.0, 12.0, 10.0], 3, &mut rng);
        assert_eq!(slope, Metric::Computed(0.0));
        assert!(!slope.is_fallback());
    }

    #[test]
    fn non_finite_prices_use_noise() {
        let mut rng = StdRng::seed_from_u64(3);
        let slope = fit_slope(&[1.0, f64::INFINITY, 3.0], 3, &mut rng);
        assert_eq!(slope.fallback_reason(), Some(FallbackReason::NonFiniteSlope));
    }

    #[tokio::test]
    async fn rising_series_trends_up_and_anchors_on_last_close() {
        let forecaster = forecaster("NVDA", &[10, 11, 12, 13, 14]);
        let mut rng = StdRng::seed_from_u64(1);
        let result = forecaster
            .predict_with_rng("NVDA", Some(7), &mut rng)
            .await
            .unwrap();

        assert_eq!(result.trend, Trend::Up);
        assert_eq!(result.last_price, 14.0);
        assert_eq!(
            result.predictions[0],
            PredictionPoint {
                date: day(5),
                price: 14.0
            }
        );

        // Anchor plus days 3..=7.
        assert_eq!(result.predictions.len(), 6);
        let dates: Vec<_> = result.predictions[1..].iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![day(8), day(9), day(10), day(11), day(12)]);
        let prices: Vec<_> = result.predictions[1..].iter().map(|p| p.price).collect();
        assert_eq!(prices, vec![17.0, 18.0, 19.0, 20.0, 21.0]);
    }

    #[tokio::test]
    async fn flat_series_trend_follows_noise_sign() {
        let forecaster = forecaster("KO", &[50, 50, 50, 50, 50]);
        for seed in 0..16 {
            let mut rng = StdRng::seed_from_u64(seed);
            let result = forecaster
                .predict_with_rng("KO", Some(7), &mut rng)
                .await
                .unwrap();
            let slope = result.slope.value();
            assert!(result.slope.is_fallback());
            assert_eq!(result.trend, Trend::from_slope(slope));
            assert!(result.predictions.iter().all(|p| p.price.is_finite()));
        }
    }

    #[tokio::test]
    async fn symmetric_series_trends_down_without_noise() {
        let forecaster = forecaster("KO", &[10, 12, 10]);
        let mut rng = StdRng::seed_from_u64(6);
        let result = forecaster
            .predict_with_rng("KO", Some(3), &mut rng)
            .await
            .unwrap();
        assert_eq!(result.trend, Trend::Down);
        assert_eq!(result.slope, Metric::Computed(0.0));
        assert_eq!(result.predictions.last().map(|p| p.price), Some(10.0));
    }

    #[test]
    fn horizon_past_the_last_date_is_rejected() {
        let mut points = history(&[10]);
        points.push(PricePoint::new(
            NaiveDate::MAX - Duration::days(1),
            Decimal::from(11),
        ));
        let mut rng = StdRng::seed_from_u64(8);

        let err = project("AAA", &points, 7, &mut rng).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidInput(_)));

        // One day still fits, and emits only the anchor.
        let result = project("AAA", &points, 1, &mut rng).unwrap();
        assert_eq!(result.predictions.len(), 1);
        assert_eq!(result.predictions[0].date, NaiveDate::MAX - Duration::days(1));
    }

    #[tokio::test]
    async fn falling_prices_are_clamped_at_zero() {
        let forecaster = forecaster("BUST", &[40, 30, 20, 10, 5]);
        let mut rng = StdRng::seed_from_u64(2);
        let result = forecaster
            .predict_with_rng("BUST", Some(10), &mut rng)
            .await
            .unwrap();

        assert_eq!(result.trend, Trend::Down);
        assert!(result.predictions.iter().all(|p| p.price >= 0.0));
        assert_eq!(result.predictions.last().map(|p| p.price), Some(0.0));
    }

    #[tokio::test]
    async fn short_horizon_emits_only_the_anchor() {
        let forecaster = forecaster("NVDA", &[10, 11, 12]);
        let mut rng = StdRng::seed_from_u64(5);
        let result = forecaster
            .predict_with_rng("NVDA", Some(2), &mut rng)
            .await
            .unwrap();
        assert_eq!(result.predictions.len(), 1);
    }

    #[tokio::test]
    async fn missing_or_zero_horizon_uses_default() {
        let forecaster = forecaster("NVDA", &[10, 11, 12]);
        assert_eq!(forecaster.horizon(None), 7);
        assert_eq!(forecaster.horizon(Some(0)), 7);
        assert_eq!(forecaster.horizon(Some(14)), 14);

        let result = forecaster.predict("NVDA", Some(0)).await.unwrap();
        assert_eq!(result.predictions.len(), 6);
    }

    #[tokio::test]
    async fn unknown_symbol_is_not_found() {
        let forecaster = forecaster("NVDA", &[10, 11, 12]);
        let err = forecaster.predict("AMD", Some(7)).await.unwrap_err();
        assert!(matches!(err, AnalyticsError::NotFound(symbol) if symbol == "AMD"));
    }

    #[tokio::test]
    async fn only_lookback_window_is_used() {
        let closes: Vec<i64> = (1..=40).collect();
        let forecaster = forecaster("SPY", &closes);
        let mut rng = StdRng::seed_from_u64(9);
        let result = forecaster
            .predict_with_rng("SPY", Some(30), &mut rng)
            .await
            .unwrap();
        assert_eq!(result.last_price, 40.0);
        assert_abs_diff_eq!(result.slope.value(), 1.0, epsilon = 1e-9);
    }
}
