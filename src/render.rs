use analytics::{PredictionResult, StatisticsReport};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn percent(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

/// Renders the statistics report as three tables: instruments, pairs, and the rollup.
pub fn statistics_tables(report: &StatisticsReport) -> String {
    let mut stocks = table(vec![
        "Symbol",
        "Company",
        "Weight",
        "Exp. Return",
        "Std. Dev.",
        "CoV",
        "Beta",
        "Points",
    ]);
    for stock in &report.stocks {
        stocks.add_row(vec![
            stock.symbol.clone(),
            stock.company_name.clone().unwrap_or_default(),
            percent(stock.weight),
            percent(stock.expected_return),
            percent(stock.standard_deviation),
            format!("{:.4}", stock.coefficient_of_variation),
            format!("{:.4}", stock.beta),
            stock.data_points.to_string(),
        ]);
    }

    let mut pairs = table(vec!["Stock 1", "Stock 2", "Correlation", "Covariance", "Points"]);
    for pair in &report.correlation_matrix {
        pairs.add_row(vec![
            pair.symbol_a.clone(),
            pair.symbol_b.clone(),
            format!("{:.4}", pair.correlation),
            format!("{:.6}", pair.covariance),
            pair.data_points.to_string(),
        ]);
    }

    let portfolio = &report.portfolio;
    let mut summary = table(vec!["Total Value", "Exp. Return", "Std. Dev.", "Beta"]);
    summary.add_row(vec![
        portfolio.total_value.to_string(),
        percent(portfolio.expected_return),
        percent(portfolio.standard_deviation),
        format!("{:.4}", portfolio.beta),
    ]);

    let range = &report.data_summary.date_range;
    format!(
        "Statistics from {} to {}\n{stocks}\n{pairs}\n{summary}",
        range.start, range.end
    )
}

pub fn prediction_table(result: &PredictionResult) -> String {
    let mut predictions = table(vec!["Date", "Price"]);
    for point in &result.predictions {
        predictions.add_row(vec![point.date.to_string(), format!("{:.2}", point.price)]);
    }
    format!(
        "{} (last price {:.2}, trend {})\n{predictions}",
        result.symbol, result.last_price, result.trend
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use analytics::{
        AggregateStatistics, CorrelationEntry, DataSummary, DateRange, InstrumentStatistics,
        Metric, PredictionPoint,
    };
    use chrono::NaiveDate;
    use core_types::Trend;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, d).unwrap()
    }

    #[test]
    fn statistics_tables_list_every_instrument_and_pair() {
        let stock = |symbol: &str| InstrumentStatistics {
            symbol: symbol.to_string(),
            company_name: Some(format!("{symbol} Inc")),
            weight: 0.5,
            coefficient_of_variation: 1.2,
            beta: 0.9,
            expected_return: 0.1234,
            standard_deviation: 0.2,
            data_points: 20,
            fallbacks: Vec::new(),
        };
        let report = StatisticsReport {
            stocks: vec![stock("AAPL"), stock("MSFT")],
            correlation_matrix: vec![CorrelationEntry {
                symbol_a: "AAPL".to_string(),
                symbol_b: "MSFT".to_string(),
                correlation: 0.75,
                covariance: 0.000123,
                data_points: 20,
                fallbacks: Vec::new(),
            }],
            portfolio: AggregateStatistics {
                beta: 0.9,
                expected_return: 0.1234,
                standard_deviation: 0.18,
                total_value: dec!(10500.25),
            },
            data_summary: DataSummary {
                date_range: DateRange {
                    start: day(1),
                    end: day(28),
                },
                data_points: BTreeMap::new(),
            },
        };

        let rendered = statistics_tables(&report);
        assert!(rendered.starts_with("Statistics from 2024-02-01 to 2024-02-28"));
        assert!(rendered.contains("MSFT Inc"));
        assert!(rendered.contains("12.34%"));
        assert!(rendered.contains("0.7500"));
        assert!(rendered.contains("10500.25"));
    }

    #[test]
    fn prediction_table_shows_trend_and_points() {
        let result = PredictionResult {
            symbol: "KO".to_string(),
            predictions: vec![
                PredictionPoint {
                    date: day(9),
                    price: 60.0,
                },
                PredictionPoint {
                    date: day(12),
                    price: 60.75,
                },
            ],
            last_price: 60.0,
            trend: Trend::Up,
            slope: Metric::Computed(0.25),
        };

        let rendered = prediction_table(&result);
        assert!(rendered.starts_with("KO (last price 60.00, trend up)"));
        assert!(rendered.contains("2024-02-12"));
        assert!(rendered.contains("60.75"));
    }
}
