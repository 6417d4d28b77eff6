use crate::error::CoreError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single closing price for one symbol on one trading day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close_price: Decimal,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close_price: Decimal) -> Self {
        Self { date, close_price }
    }
}

/// A full daily OHLCV row as it is imported and stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open_price: Decimal,
    pub high_price: Decimal,
    pub low_price: Decimal,
    pub close_price: Decimal,
    pub volume: i64,
}

impl PriceBar {
    /// Rejects bars with an empty symbol, a non-positive price, or a non-positive volume.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.symbol.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "symbol".to_string(),
                "must not be empty".to_string(),
            ));
        }
        let prices = [
            ("open_price", self.open_price),
            ("high_price", self.high_price),
            ("low_price", self.low_price),
            ("close_price", self.close_price),
        ];
        for (field, value) in prices {
            if value <= Decimal::ZERO {
                return Err(CoreError::InvalidInput(
                    field.to_string(),
                    format!("must be positive, got {value}"),
                ));
            }
        }
        if self.volume <= 0 {
            return Err(CoreError::InvalidInput(
                "volume".to_string(),
                format!("must be positive, got {}", self.volume),
            ));
        }
        Ok(())
    }

    pub fn to_price_point(&self) -> PricePoint {
        PricePoint::new(self.date, self.close_price)
    }
}

/// An instrument held in a portfolio or stock list together with its live valuation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub quantity: Decimal,
    pub current_price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
}

impl Holding {
    pub fn new(symbol: impl Into<String>, quantity: Decimal, current_price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            quantity,
            current_price,
            company_name: None,
        }
    }

    pub fn with_company_name(mut self, company_name: impl Into<String>) -> Self {
        self.company_name = Some(company_name.into());
        self
    }

    /// The market value of the position: `quantity * current_price`, or `None` when
    /// the product does not fit in a `Decimal`.
    pub fn value(&self) -> Option<Decimal> {
        self.quantity.checked_mul(self.current_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bar() -> PriceBar {
        PriceBar {
            symbol: "AAPL".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            open_price: dec!(185.0),
            high_price: dec!(188.4),
            low_price: dec!(183.9),
            close_price: dec!(185.6),
            volume: 82_488_700,
        }
    }

    #[test]
    fn holding_value_is_quantity_times_price() {
        let holding = Holding::new("MSFT", dec!(12), dec!(370.25));
        assert_eq!(holding.value(), Some(dec!(4443.00)));
    }

    #[test]
    fn holding_value_overflow_is_none() {
        let huge = Decimal::from(10u64.pow(15)) * Decimal::from(10u64.pow(5));
        assert_eq!(Holding::new("AAA", huge, huge).value(), None);
    }

    #[test]
    fn valid_bar_passes() {
        assert!(bar().validate().is_ok());
    }

    #[test]
    fn bar_with_zero_close_is_rejected() {
        let mut bad = bar();
        bad.close_price = Decimal::ZERO;
        let err = bad.validate().unwrap_err();
        assert!(err.to_string().contains("close_price"));
    }

    #[test]
    fn bar_with_blank_symbol_is_rejected() {
        let mut bad = bar();
        bad.symbol = "  ".to_string();
        assert!(bad.validate().is_err());
    }
}
