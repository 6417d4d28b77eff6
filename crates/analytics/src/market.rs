use crate::alignment::SeriesAlignment;
use crate::metric::{FallbackReason, Metric};
use crate::returns::ReturnSeries;
use std::collections::HashMap;

/// A value-weighted "market" return series synthesized from the holdings themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSeries {
    pub returns: ReturnSeries,
    /// Sum of the weights that contributed to every row.
    pub weight_sum: Metric,
}

/// Builds the market series as a weighted average of every instrument's returns.
///
/// Rows are produced by `alignment` across all instruments. If fewer than two rows
/// align, the market series is empty. A symbol without an entry in `weights`
/// contributes with weight 0; if no weight is positive, every row is 0.
pub fn synthesize_market_returns(
    alignment: &dyn SeriesAlignment,
    instruments: &[(&str, &ReturnSeries)],
    weights: &HashMap<String, f64>,
) -> MarketSeries {
    let weight_of = |symbol: &str| weights.get(symbol).copied().unwrap_or(0.0);
    let total_weight: f64 = instruments.iter().map(|(symbol, _)| weight_of(symbol)).sum();
    let weight_sum = if total_weight > 0.0 {
        Metric::Computed(total_weight)
    } else {
        Metric::fallback(FallbackReason::ZeroWeightSum, 0.0)
    };

    let series: Vec<&ReturnSeries> = instruments.iter().map(|(_, returns)| *returns).collect();
    let aligned = alignment.align_all(&series);
    if aligned.len() < 2 {
        return MarketSeries {
            returns: ReturnSeries::empty(),
            weight_sum,
        };
    }

    let values = (0..aligned.len())
        .map(|row| {
            if weight_sum.is_fallback() {
                return 0.0;
            }
            let weighted: f64 = instruments
                .iter()
                .zip(&aligned.columns)
                .map(|((symbol, _), column)| column[row] * weight_of(symbol))
                .sum();
            weighted / total_weight
        })
        .collect();

    MarketSeries {
        returns: ReturnSeries::new(aligned.dates, values),
        weight_sum,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::PositionalAlignment;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    fn series(values: &[f64]) -> ReturnSeries {
        let dates = (0..values.len() as u32)
            .map(|i| NaiveDate::from_ymd_opt(2024, 2, 1 + i).unwrap())
            .collect();
        ReturnSeries::new(dates, values.to_vec())
    }

    #[test]
    fn market_is_weighted_average_per_day() {
        let a = series(&[0.01, 0.02, -0.01]);
        let b = series(&[0.03, -0.02, 0.00, 0.05]);
        let weights = HashMap::from([("A".to_string(), 0.75), ("B".to_string(), 0.25)]);

        let market = synthesize_market_returns(&PositionalAlignment, &[("A", &a), ("B", &b)], &weights);

        assert_eq!(market.returns.len(), 3);
        assert_abs_diff_eq!(market.weight_sum.value(), 1.0, epsilon = 1e-12);
        let expected = [0.015, 0.01, -0.0075];
        for (got, want) in market.returns.values().iter().zip(expected) {
            assert_abs_diff_eq!(*got, want, epsilon = 1e-12);
        }
    }

    #[test]
    fn partial_weights_are_renormalized() {
        let a = series(&[0.02, 0.04, 0.06]);
        let b = series(&[0.10, 0.10, 0.10]);
        let weights = HashMap::from([("A".to_string(), 0.3)]);

        let market = synthesize_market_returns(&PositionalAlignment, &[("A", &a), ("B", &b)], &weights);

        assert_abs_diff_eq!(market.weight_sum.value(), 0.3, epsilon = 1e-12);
        for (got, want) in market.returns.values().iter().zip(a.values()) {
            assert_abs_diff_eq!(*got, *want, epsilon = 1e-12);
        }
    }

    #[test]
    fn fewer_than_two_rows_is_empty() {
        let a = series(&[0.01]);
        let b = series(&[0.02, 0.03]);
        let weights = HashMap::from([("A".to_string(), 0.5), ("B".to_string(), 0.5)]);

        let market = synthesize_market_returns(&PositionalAlignment, &[("A", &a), ("B", &b)], &weights);
        assert!(market.returns.is_empty());
    }

    #[test]
    fn zero_weights_give_flat_market() {
        let a = series(&[0.01, 0.02, 0.03]);
        let weights = HashMap::from([("A".to_string(), 0.0)]);

        let market = synthesize_market_returns(&PositionalAlignment, &[("A", &a)], &weights);
        assert_eq!(market.returns.values(), &[0.0, 0.0, 0.0]);
        assert_eq!(
            market.weight_sum.fallback_reason(),
            Some(FallbackReason::ZeroWeightSum)
        );
    }
}
