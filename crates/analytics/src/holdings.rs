use crate::error::AnalyticsError;
use crate::metric::{FallbackReason, Metric};
use core_types::Holding;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::collections::HashSet;
use std::sync::Arc;

/// An immutable, validated set of holdings for one statistics request.
///
/// The snapshot is built once and shared; nothing can change it while the price
/// histories are being fetched.
#[derive(Debug, Clone)]
pub struct HoldingsSnapshot {
    holdings: Arc<[Holding]>,
    values: Arc<[Decimal]>,
    total_value: Decimal,
}

impl HoldingsSnapshot {
    /// Validates and freezes `holdings`.
    ///
    /// Every quantity must be positive, no current price may be negative, and each
    /// symbol may appear only once. Position values and their total must fit in a
    /// `Decimal`.
    pub fn new(holdings: Vec<Holding>) -> Result<Self, AnalyticsError> {
        let mut seen = HashSet::with_capacity(holdings.len());
        let mut values = Vec::with_capacity(holdings.len());
        let mut total_value = Decimal::ZERO;
        for holding in holdings.iter() {
            if holding.quantity <= Decimal::ZERO {
                return Err(AnalyticsError::InvalidInput(format!(
                    "quantity for {} must be positive, got {}",
                    holding.symbol, holding.quantity
                )));
            }
            if holding.current_price < Decimal::ZERO {
                return Err(AnalyticsError::InvalidInput(format!(
                    "current price for {} must not be negative, got {}",
                    holding.symbol, holding.current_price
                )));
            }
            if !seen.insert(holding.symbol.clone()) {
                return Err(AnalyticsError::InvalidInput(format!(
                    "symbol {} appears more than once",
                    holding.symbol
                )));
            }

            let value = holding.value().ok_or_else(|| {
                AnalyticsError::InvalidInput(format!(
                    "value of {} ({} x {}) overflows",
                    holding.symbol, holding.quantity, holding.current_price
                ))
            })?;
            total_value = total_value.checked_add(value).ok_or_else(|| {
                AnalyticsError::InvalidInput(format!(
                    "total value overflows after adding {}",
                    holding.symbol
                ))
            })?;
            values.push(value);
        }
        Ok(Self {
            holdings: holdings.into(),
            values: values.into(),
            total_value,
        })
    }

    pub fn as_slice(&self) -> &[Holding] {
        &self.holdings
    }

    pub fn iter(&self) -> impl Iterator<Item = &Holding> {
        self.holdings.iter()
    }

    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.holdings.iter().map(|h| h.symbol.as_str())
    }

    /// `Σ quantity * current_price`.
    pub fn total_value(&self) -> Decimal {
        self.total_value
    }

    /// Value weight of every holding, in snapshot order.
    ///
    /// With a total value of 0 the weights are undefined; each one becomes
    /// `Fallback(ZeroTotalValue, 0.0)`.
    pub fn weights(&self) -> Result<Vec<Metric>, AnalyticsError> {
        let total = self.total_value;
        if total.is_zero() {
            return Ok(self
                .holdings
                .iter()
                .map(|_| Metric::fallback(FallbackReason::ZeroTotalValue, 0.0))
                .collect());
        }

        self.holdings
            .iter()
            .zip(self.values.iter())
            .map(|(h, value)| {
                (*value / total)
                    .to_f64()
                    .map(Metric::Computed)
                    .ok_or_else(|| {
                        AnalyticsError::Calculation(format!("weight of {} is not representable", h.symbol))
                    })
            })
            .collect()
    }
}

impl TryFrom<Vec<Holding>> for HoldingsSnapshot {
    type Error = AnalyticsError;

    fn try_from(holdings: Vec<Holding>) -> Result<Self, Self::Error> {
        Self::new(holdings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn weights_sum_to_one() {
        let snapshot = HoldingsSnapshot::new(vec![
            Holding::new("AAPL", dec!(10), dec!(189.37)),
            Holding::new("MSFT", dec!(3), dec!(402.10)),
            Holding::new("KO", dec!(40), dec!(59.91)),
        ])
        .unwrap();

        let weights = snapshot.weights().unwrap();
        let total: f64 = weights.iter().map(Metric::value).sum();
        assert_abs_diff_eq!(total, 1.0, epsilon = 1e-12);
        assert!(weights.iter().all(|w| !w.is_fallback()));
        assert_eq!(snapshot.total_value(), dec!(5496.40));
    }

    #[test]
    fn zero_total_value_falls_back_to_zero_weights() {
        let snapshot = HoldingsSnapshot::new(vec![
            Holding::new("AAPL", dec!(10), dec!(0)),
            Holding::new("MSFT", dec!(3), dec!(0)),
        ])
        .unwrap();

        let weights = snapshot.weights().unwrap();
        assert!(weights.iter().all(|w| w.value() == 0.0));
        assert!(
            weights
                .iter()
                .all(|w| w.fallback_reason() == Some(FallbackReason::ZeroTotalValue))
        );
    }

    #[test]
    fn rejects_non_positive_quantity() {
        let err = HoldingsSnapshot::new(vec![Holding::new("AAPL", dec!(0), dec!(100))]).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidInput(_)));
    }

    #[test]
    fn rejects_position_value_that_overflows() {
        let huge = Decimal::from(10u64.pow(15)) * Decimal::from(10u64.pow(5));
        let err = HoldingsSnapshot::new(vec![Holding::new("AAA", huge, huge)]).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidInput(ref msg) if msg.contains("AAA")));
    }

    #[test]
    fn rejects_total_value_that_overflows() {
        // Each position fits on its own; their sum does not.
        let big = Decimal::MAX / dec!(2) + dec!(1);
        let err = HoldingsSnapshot::new(vec![
            Holding::new("AAA", dec!(1), big),
            Holding::new("BBB", dec!(1), big),
        ])
        .unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidInput(ref msg) if msg.contains("total")));
    }

    #[test]
    fn rejects_duplicate_symbols() {
        let err = HoldingsSnapshot::new(vec![
            Holding::new("AAPL", dec!(1), dec!(100)),
            Holding::new("AAPL", dec!(2), dec!(100)),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn clones_share_the_same_holdings() {
        let snapshot = HoldingsSnapshot::new(vec![Holding::new("KO", dec!(1), dec!(60))]).unwrap();
        let copy = snapshot.clone();
        assert!(std::ptr::eq(snapshot.as_slice(), copy.as_slice()));
    }
}
