use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use core_types::PriceBar;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One row of a price history export.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(rename = "Code")]
    code: String,
    #[serde(rename = "Timestamp")]
    timestamp: String,
    #[serde(rename = "Open", with = "rust_decimal::serde::str")]
    open: Decimal,
    #[serde(rename = "High", with = "rust_decimal::serde::str")]
    high: Decimal,
    #[serde(rename = "Low", with = "rust_decimal::serde::str")]
    low: Decimal,
    #[serde(rename = "Close", with = "rust_decimal::serde::str")]
    close: Decimal,
    #[serde(rename = "Volume", with = "rust_decimal::serde::str")]
    volume: Decimal,
}

/// Reads `Code,Timestamp,Open,High,Low,Close,Volume` rows into validated bars.
///
/// The first malformed row aborts the read with its line number in the error.
pub fn read_price_bars<R: Read>(reader: R) -> Result<Vec<PriceBar>> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut bars = Vec::new();
    for (index, record) in csv_reader.deserialize::<CsvRecord>().enumerate() {
        // Header is line 1.
        let line = index + 2;
        let record = record.with_context(|| format!("Malformed CSV row at line {line}"))?;
        let bar = to_price_bar(record).with_context(|| format!("Invalid price row at line {line}"))?;
        bars.push(bar);
    }
    Ok(bars)
}

fn to_price_bar(record: CsvRecord) -> Result<PriceBar> {
    let volume = record.volume.trunc();
    let volume = i64::try_from(volume).with_context(|| format!("volume {volume} is out of range"))?;

    let bar = PriceBar {
        symbol: record.code.to_uppercase(),
        date: parse_trading_date(&record.timestamp)?,
        open_price: record.open,
        high_price: record.high,
        low_price: record.low,
        close_price: record.close,
        volume,
    };
    bar.validate()?;
    Ok(bar)
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`, or RFC 3339 and keeps only the date.
pub fn parse_trading_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(timestamp) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(timestamp.date());
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(timestamp.date_naive());
    }
    bail!("unrecognized timestamp '{raw}'")
}

/// Name given to stocks first seen in an import.
pub fn placeholder_company_name(symbol: &str) -> String {
    format!("Company {symbol}")
}
