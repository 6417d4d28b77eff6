use crate::error::AnalyticsError;
use chrono::NaiveDate;
use core_types::PricePoint;
use rust_decimal::prelude::ToPrimitive;
use std::collections::BTreeMap;

/// The closing prices of one symbol, strictly ascending by date.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    symbol: String,
    dates: Vec<NaiveDate>,
    closes: Vec<f64>,
}

impl PriceSeries {
    /// Builds a series from store output, converting decimal closes to `f64`.
    pub fn new(symbol: impl Into<String>, points: &[PricePoint]) -> Result<Self, AnalyticsError> {
        let symbol = symbol.into();
        if points.windows(2).any(|w| w[0].date >= w[1].date) {
            return Err(AnalyticsError::InvalidInput(format!(
                "price history for {symbol} is not strictly ascending by date"
            )));
        }

        let closes = points
            .iter()
            .map(|p| {
                p.close_price.to_f64().ok_or_else(|| {
                    AnalyticsError::Calculation(format!(
                        "close price {} for {symbol} on {} is not representable",
                        p.close_price, p.date
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            dates: points.iter().map(|p| p.date).collect(),
            closes,
            symbol,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    pub fn closes(&self) -> &[f64] {
        &self.closes
    }

    /// Derives the simple daily returns: `(close[i+1] - close[i]) / close[i]`.
    ///
    /// Each return is dated with the later of its two prices. At least two prices are
    /// required; otherwise this fails with `InsufficientData` naming the symbol.
    pub fn returns(&self) -> Result<ReturnSeries, AnalyticsError> {
        if self.closes.len() < 2 {
            return Err(AnalyticsError::InsufficientData {
                counts: BTreeMap::from([(self.symbol.clone(), self.closes.len())]),
            });
        }

        let values = self
            .closes
            .windows(2)
            .map(|w| (w[1] - w[0]) / w[0])
            .collect();

        Ok(ReturnSeries {
            dates: self.dates[1..].to_vec(),
            values,
        })
    }
}

/// A sequence of simple daily returns with the date each return was realized on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReturnSeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl ReturnSeries {
    /// Pairs dates with values; extra entries on the longer side are dropped.
    pub fn new(mut dates: Vec<NaiveDate>, mut values: Vec<f64>) -> Self {
        let n = dates.len().min(values.len());
        dates.truncate(n);
        values.truncate(n);
        Self { dates, values }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Arithmetic mean; 0 for an empty series.
    pub fn mean(&self) -> f64 {
        mean(&self.values)
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
