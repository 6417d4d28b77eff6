use crate::error::StoreError;
use async_trait::async_trait;
use chrono::NaiveDate;
use core_types::{PriceBar, PricePoint};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// The source of closing-price history consumed by the engine.
///
/// This trait is the contract between the analytics engine and whatever holds the
/// prices, allowing a database, a file, or a test fixture to be swapped in.
#[async_trait]
pub trait PriceHistoryStore: Send + Sync {
    /// Closing prices for `symbol` within `[start, end]` (inclusive), ascending by date.
    async fn get_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, StoreError>;

    /// The `limit` most recent closing prices for `symbol`, descending by date.
    async fn get_recent_prices(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<PricePoint>, StoreError>;

    /// The most recent closing price for `symbol`, if any.
    async fn get_latest_price(&self, symbol: &str) -> Result<Option<PricePoint>, StoreError>;
}

/// A price store held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPriceStore {
    prices: BTreeMap<String, BTreeMap<NaiveDate, Decimal>>,
}

impl InMemoryPriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from imported bars, keeping only the closing prices.
    pub fn from_bars<'a>(bars: impl IntoIterator<Item = &'a PriceBar>) -> Self {
        let mut store = Self::new();
        for bar in bars {
            store.insert(&bar.symbol, bar.date, bar.close_price);
        }
        store
    }

    /// Records a close; a later insert for the same (symbol, date) replaces the earlier one.
    pub fn insert(&mut self, symbol: &str, date: NaiveDate, close_price: Decimal) {
        self.prices
            .entry(symbol.to_string())
            .or_default()
            .insert(date, close_price);
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.prices.keys().map(String::as_str)
    }

    /// Number of price points stored for `symbol`.
    pub fn point_count(&self, symbol: &str) -> usize {
        self.prices.get(symbol).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.prices.values().all(BTreeMap::is_empty)
    }
}

#[async_trait]
impl PriceHistoryStore for InMemoryPriceStore {
    async fn get_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, StoreError> {
        if start > end {
            return Ok(Vec::new());
        }
        Ok(self
            .prices
            .get(symbol)
            .map(|series| {
                series
                    .range(start..=end)
                    .map(|(date, close)| PricePoint::new(*date, *close))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_recent_prices(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<PricePoint>, StoreError> {
        Ok(self
            .prices
            .get(symbol)
            .map(|series| {
                series
                    .iter()
                    .rev()
                    .take(limit)
                    .map(|(date, close)| PricePoint::new(*date, *close))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_latest_price(&self, symbol: &str) -> Result<Option<PricePoint>, StoreError> {
        Ok(self
            .prices
            .get(symbol)
            .and_then(|series| series.last_key_value())
            .map(|(date, close)| PricePoint::new(*date, *close)))
    }
}
