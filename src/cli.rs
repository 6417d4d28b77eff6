use chrono::NaiveDate;
use clap::{ArgGroup, Parser, Subcommand};
use configuration::OutputFormat;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;

/// Portfolio and stock list analytics over daily closing prices.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file. A missing file means defaults.
    #[arg(long, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load daily price bars from a CSV export into the database.
    Import(ImportArgs),
    /// Record a single day's prices for a known stock.
    AddPrice(AddPriceArgs),
    /// Compute risk and return statistics for a set of holdings.
    Statistics(StatisticsArgs),
    /// Project a symbol's recent closing prices forward.
    Predict(PredictArgs),
}

#[derive(Parser)]
pub struct ImportArgs {
    /// CSV file with the columns Code,Timestamp,Open,High,Low,Close,Volume.
    #[arg(long, short)]
    pub file: PathBuf,
}

#[derive(Parser)]
pub struct AddPriceArgs {
    #[arg(long)]
    pub symbol: String,
    /// Trading day (format: YYYY-MM-DD).
    #[arg(long)]
    pub date: NaiveDate,
    #[arg(long)]
    pub open: Decimal,
    #[arg(long)]
    pub high: Decimal,
    #[arg(long)]
    pub low: Decimal,
    #[arg(long)]
    pub close: Decimal,
    #[arg(long)]
    pub volume: i64,
}

#[derive(Parser)]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .args(["list", "portfolio", "holdings"])
))]
pub struct StatisticsArgs {
    /// First day of the analysed range (format: YYYY-MM-DD).
    #[arg(long)]
    pub from: NaiveDate,

    /// Last day of the analysed range (format: YYYY-MM-DD).
    #[arg(long)]
    pub to: NaiveDate,

    /// Analyse the items of a stored stock list.
    #[arg(long, conflicts_with = "csv")]
    pub list: Option<i32>,

    /// Analyse the holdings of a stored portfolio.
    #[arg(long, conflicts_with = "csv")]
    pub portfolio: Option<i32>,

    /// Ad-hoc holding as SYMBOL:QUANTITY[:PRICE]; repeatable. Without a price the
    /// latest close is used.
    #[arg(long = "holding", value_name = "SYMBOL:QTY[:PRICE]")]
    pub holdings: Vec<HoldingArg>,

    /// Read prices from this CSV file instead of the database.
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Overrides `output.format` from the configuration.
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,
}

#[derive(Parser)]
pub struct PredictArgs {
    #[arg(long)]
    pub symbol: String,

    /// Forecast horizon in days; 0 or absent uses the configured default.
    #[arg(long)]
    pub days: Option<u32>,

    /// Read prices from this CSV file instead of the database.
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Overrides `output.format` from the configuration.
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,
}

/// A holding given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldingArg {
    pub symbol: String,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
}

impl FromStr for HoldingArg {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut parts = raw.split(':');
        let symbol = parts.next().map(str::trim).unwrap_or_default();
        if symbol.is_empty() {
            return Err(format!("'{raw}' has no symbol"));
        }
        let quantity = parts
            .next()
            .ok_or_else(|| format!("'{raw}' has no quantity"))?
            .trim()
            .parse::<Decimal>()
            .map_err(|e| format!("invalid quantity in '{raw}': {e}"))?;
        let price = parts
            .next()
            .map(|p| p.trim().parse::<Decimal>())
            .transpose()
            .map_err(|e| format!("invalid price in '{raw}': {e}"))?;
        if parts.next().is_some() {
            return Err(format!("'{raw}' has too many fields"));
        }

        Ok(Self {
            symbol: symbol.to_uppercase(),
            quantity,
            price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rust_decimal_macros::dec;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_holding_with_and_without_price() {
        assert_eq!(
            "aapl:10".parse::<HoldingArg>().unwrap(),
            HoldingArg {
                symbol: "AAPL".to_string(),
                quantity: dec!(10),
                price: None
            }
        );
        assert_eq!(
            "KO:2.5:59.91".parse::<HoldingArg>().unwrap().price,
            Some(dec!(59.91))
        );
    }

    #[test]
    fn rejects_malformed_holdings() {
        assert!("AAPL".parse::<HoldingArg>().is_err());
        assert!(":10".parse::<HoldingArg>().is_err());
        assert!("AAPL:ten".parse::<HoldingArg>().is_err());
        assert!("AAPL:1:2:3".parse::<HoldingArg>().is_err());
    }

    #[test]
    fn statistics_requires_exactly_one_source() {
        let base = ["stockfolio", "statistics", "--from", "2024-01-01", "--to", "2024-03-31"];
        assert!(Cli::try_parse_from(base).is_err());

        let with_list = [&base[..], &["--list", "3", "--portfolio", "4"][..]].concat();
        assert!(Cli::try_parse_from(with_list).is_err());

        let with_holdings = [&base[..], &["--holding", "AAPL:10", "--holding", "MSFT:5:400"][..]].concat();
        let cli = Cli::try_parse_from(with_holdings).unwrap();
        match cli.command {
            Commands::Statistics(args) => assert_eq!(args.holdings.len(), 2),
            _ => panic!("expected statistics"),
        }
    }

    #[test]
    fn stored_sources_need_the_database() {
        let args = [
            "stockfolio", "statistics", "--from", "2024-01-01", "--to", "2024-03-31", "--list", "1",
            "--csv", "prices.csv",
        ];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn predict_accepts_table_format() {
        let cli = Cli::try_parse_from(["stockfolio", "predict", "--symbol", "KO", "--format", "table"])
            .unwrap();
        match cli.command {
            Commands::Predict(args) => assert_eq!(args.format, Some(OutputFormat::Table)),
            _ => panic!("expected predict"),
        }
    }
}
