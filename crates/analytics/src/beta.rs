use crate::alignment::SeriesAlignment;
use crate::covariance::{sample_covariance_and_correlation, sample_variance};
use crate::metric::{FallbackReason, Metric};
use crate::returns::ReturnSeries;

/// Beta of an instrument against a market series: `cov(instrument, market) / var(market)`.
///
/// Both series are aligned first and the market variance is taken over the aligned rows.
/// Returns 0 when fewer than two rows overlap or the market does not move.
pub fn beta(
    alignment: &dyn SeriesAlignment,
    instrument: &ReturnSeries,
    market: &ReturnSeries,
) -> Metric {
    if instrument.len() < 2 || market.len() < 2 {
        return Metric::fallback(FallbackReason::InsufficientSamples, 0.0);
    }

    let pair = alignment.align_pair(instrument, market);
    if pair.len() < 2 {
        return Metric::fallback(FallbackReason::InsufficientSamples, 0.0);
    }

    let covariance = sample_covariance_and_correlation(&pair.left, &pair.right).covariance;
    let market_variance = sample_variance(&pair.right).value();
    if market_variance == 0.0 {
        return Metric::fallback(FallbackReason::ZeroMarketVariance, 0.0);
    }

    Metric::Computed(covariance.value() / market_variance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::PositionalAlignment;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    fn series(values: &[f64]) -> ReturnSeries {
        let dates = (0..values.len() as u32)
            .map(|i| NaiveDate::from_ymd_opt(2023, 11, 1 + i).unwrap())
            .collect();
        ReturnSeries::new(dates, values.to_vec())
    }

    #[test]
    fn instrument_against_itself_has_unit_beta() {
        let a = series(&[0.01, 0.02, -0.01]);
        let result = beta(&PositionalAlignment, &a, &a);
        assert!(!result.is_fallback());
        assert_abs_diff_eq!(result.value(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn scaled_instrument_has_scaled_beta() {
        let market = series(&[0.005, 0.01, -0.005, 0.015, -0.01]);
        let levered = series(&[0.01, 0.02, -0.01, 0.03, -0.02]);
        assert_abs_diff_eq!(
            beta(&PositionalAlignment, &levered, &market).value(),
            2.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn short_series_gives_zero() {
        let a = series(&[0.01]);
        let m = series(&[0.01, 0.02, 0.03]);
        let result = beta(&PositionalAlignment, &a, &m);
        assert_eq!(result.value(), 0.0);
        assert_eq!(result.fallback_reason(), Some(FallbackReason::InsufficientSamples));
    }

    #[test]
    fn empty_market_gives_zero() {
        let a = series(&[0.01, 0.02, 0.03]);
        let result = beta(&PositionalAlignment, &a, &ReturnSeries::empty());
        assert_eq!(result.value(), 0.0);
    }

    #[test]
    fn flat_market_gives_zero() {
        let a = series(&[0.01, 0.02, 0.03]);
        let m = series(&[0.5, 0.5, 0.5]);
        let result = beta(&PositionalAlignment, &a, &m);
        assert_eq!(result.value(), 0.0);
        assert_eq!(result.fallback_reason(), Some(FallbackReason::ZeroMarketVariance));
    }
}
