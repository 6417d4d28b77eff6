use std::collections::BTreeMap;
use thiserror::Error;

/// Failure reported by a `PriceHistoryStore` backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Price store backend failure: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error(
        "Insufficient data points. Need at least 2 data points for each stock. Current data points: {}",
        format_counts(.counts)
    )]
    InsufficientData { counts: BTreeMap<String, usize> },

    #[error("No historical data found for {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Price store error: {0}")]
    Store(#[from] StoreError),

    #[error("Error in calculation: {0}")]
    Calculation(String),
}

fn format_counts(counts: &BTreeMap<String, usize>) -> String {
    counts
        .iter()
        .map(|(symbol, count)| format!("{symbol}: {count}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_lists_every_symbol() {
        let counts = BTreeMap::from([("MSFT".to_string(), 5), ("AAPL".to_string(), 1)]);
        let err = AnalyticsError::InsufficientData { counts };
        assert_eq!(
            err.to_string(),
            "Insufficient data points. Need at least 2 data points for each stock. \
             Current data points: AAPL: 1, MSFT: 5"
        );
    }
}
