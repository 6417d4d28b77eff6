mod cli;
mod import;
mod render;

use analytics::{
    ForecastOptions, HoldingsSnapshot, InMemoryPriceStore, PriceHistoryStore,
    StatisticsAggregator, StatisticsOptions, TrendForecaster,
};
use anyhow::{Context, Result, bail};
use clap::Parser;
use cli::{AddPriceArgs, Cli, Commands, HoldingArg, ImportArgs, PredictArgs, StatisticsArgs};
use configuration::{Config, LoggingSettings, OutputFormat, load_config};
use core_types::{Holding, PriceBar};
use database::{DbRepository, InsertOutcome, connect, run_migrations};
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// The main entry point for the Stockfolio application.
#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file, if there is one.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    // Held until exit so buffered log lines are flushed.
    let _log_guard = init_tracing(&config.logging)?;

    match cli.command {
        Commands::Import(args) => handle_import(args, &config).await,
        Commands::AddPrice(args) => handle_add_price(args, &config).await,
        Commands::Statistics(args) => handle_statistics(args, &config).await,
        Commands::Predict(args) => handle_predict(args, &config).await,
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(settings: &LoggingSettings) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .with_context(|| format!("Invalid log level '{}'", settings.level))?;

    match &settings.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "stockfolio.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
            Ok(Some(guard))
        }
        None => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
            Ok(None)
        }
    }
}

async fn open_repository(config: &Config) -> Result<DbRepository> {
    let pool = connect(&config.database)
        .await
        .context("Failed to connect to the database")?;
    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    Ok(DbRepository::new(pool))
}

fn load_csv_store(path: &Path) -> Result<InMemoryPriceStore> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let bars = import::read_price_bars(file)
        .with_context(|| format!("Failed to read prices from {}", path.display()))?;
    let store = InMemoryPriceStore::from_bars(&bars);
    info!(bars = bars.len(), symbols = store.symbols().count(), "Loaded CSV price store.");
    Ok(store)
}

fn print_output<T: Serialize>(
    value: &T,
    format: OutputFormat,
    as_table: impl FnOnce(&T) -> String,
) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Table => println!("{}", as_table(value)),
    }
    Ok(())
}

// ==============================================================================
// Import Command Logic
// ==============================================================================

/// Upserts every bar of a CSV export, one concurrent task per symbol.
async fn handle_import(args: ImportArgs, config: &Config) -> Result<()> {
    let file = File::open(&args.file)
        .with_context(|| format!("Failed to open {}", args.file.display()))?;
    let bars = import::read_price_bars(file)
        .with_context(|| format!("Failed to read prices from {}", args.file.display()))?;
    if bars.is_empty() {
        warn!(file = %args.file.display(), "No price rows found; nothing to import.");
        return Ok(());
    }

    let repo = open_repository(config).await?;

    let mut by_symbol: BTreeMap<String, Vec<PriceBar>> = BTreeMap::new();
    for bar in bars {
        by_symbol.entry(bar.symbol.clone()).or_default().push(bar);
    }
    let total: usize = by_symbol.values().map(Vec::len).sum();
    info!(symbols = by_symbol.len(), bars = total, "Starting import.");

    let progress_bar = ProgressBar::new(total as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
            .progress_chars("#>-"),
    );

    let tasks: Vec<_> = by_symbol
        .into_iter()
        .map(|(symbol, bars)| {
            let repo = repo.clone();
            let pb = progress_bar.clone();

            tokio::spawn(async move {
                repo.ensure_stock(&symbol, &import::placeholder_company_name(&symbol))
                    .await?;
                let mut inserted = 0usize;
                for bar in &bars {
                    if repo.upsert_price_bar(bar).await? == InsertOutcome::Inserted {
                        inserted += 1;
                    }
                    pb.inc(1);
                }
                pb.set_message(format!("Done {symbol}"));
                Ok::<_, anyhow::Error>((symbol, inserted, bars.len() - inserted))
            })
        })
        .collect();

    let results = join_all(tasks).await;
    progress_bar.finish_with_message("Import complete!");

    let mut failures = 0;
    for result in results {
        match result {
            Ok(Ok((symbol, inserted, updated))) => {
                info!(%symbol, inserted, updated, "Imported price history.");
            }
            Ok(Err(e)) => {
                failures += 1;
                warn!(error = %e, "Import task failed.");
            }
            Err(e) => {
                failures += 1;
                warn!(error = %e, "Import task panicked.");
            }
        }
    }
    if failures > 0 {
        bail!("{failures} symbol(s) failed to import");
    }
    Ok(())
}

// ==============================================================================
// Add-Price Command Logic
// ==============================================================================

async fn handle_add_price(args: AddPriceArgs, config: &Config) -> Result<()> {
    let bar = PriceBar {
        symbol: args.symbol.trim().to_uppercase(),
        date: args.date,
        open_price: args.open,
        high_price: args.high,
        low_price: args.low,
        close_price: args.close,
        volume: args.volume,
    };
    // Checked before any connection is opened.
    bar.validate()?;

    let repo = open_repository(config).await?;
    repo.insert_price_bar(&bar)
        .await
        .with_context(|| format!("Failed to add price for {} on {}", bar.symbol, bar.date))?;
    info!(symbol = %bar.symbol, date = %bar.date, close = %bar.close_price, "Price added.");
    println!("{}", serde_json::to_string_pretty(&bar)?);
    Ok(())
}

// ==============================================================================
// Statistics Command Logic
// ==============================================================================

/// Values ad-hoc holdings, filling a missing price from the store's latest close.
async fn resolve_holdings(
    store: &dyn PriceHistoryStore,
    holdings: &[HoldingArg],
) -> Result<Vec<Holding>> {
    let mut resolved = Vec::with_capacity(holdings.len());
    for arg in holdings {
        let price = match arg.price {
            Some(price) => price,
            None => store
                .get_latest_price(&arg.symbol)
                .await?
                .map_or(Decimal::ZERO, |p| p.close_price),
        };
        resolved.push(Holding::new(arg.symbol.clone(), arg.quantity, price));
    }
    Ok(resolved)
}

async fn handle_statistics(args: StatisticsArgs, config: &Config) -> Result<()> {
    let (store, holdings): (Arc<dyn PriceHistoryStore>, Vec<Holding>) = match &args.csv {
        Some(path) => {
            let store = load_csv_store(path)?;
            let holdings = resolve_holdings(&store, &args.holdings).await?;
            (Arc::new(store), holdings)
        }
        None => {
            let repo = open_repository(config).await?;
            let holdings = if let Some(list_id) = args.list {
                repo.get_stock_list_holdings(list_id).await?
            } else if let Some(portfolio_id) = args.portfolio {
                repo.get_portfolio_holdings(portfolio_id).await?
            } else {
                resolve_holdings(&repo, &args.holdings).await?
            };
            (Arc::new(repo), holdings)
        }
    };

    let snapshot = HoldingsSnapshot::new(holdings)?;
    let aggregator = StatisticsAggregator::new(
        store,
        StatisticsOptions {
            trading_days_per_year: config.analytics.trading_days_per_year,
        },
    );
    let report = aggregator
        .compute_statistics(&snapshot, args.from, args.to)
        .await?;

    print_output(
        &report,
        args.format.unwrap_or(config.output.format),
        render::statistics_tables,
    )
}

// ==============================================================================
// Predict Command Logic
// ==============================================================================

async fn handle_predict(args: PredictArgs, config: &Config) -> Result<()> {
    let store: Arc<dyn PriceHistoryStore> = match &args.csv {
        Some(path) => Arc::new(load_csv_store(path)?),
        None => Arc::new(open_repository(config).await?),
    };

    let forecaster = TrendForecaster::new(
        store,
        ForecastOptions {
            lookback: config.analytics.forecast_lookback,
            default_horizon_days: config.analytics.default_horizon_days,
        },
    );
    let symbol = args.symbol.trim().to_uppercase();
    let prediction = forecaster.predict(&symbol, args.days).await?;

    print_output(
        &prediction,
        args.format.unwrap_or(config.output.format),
        render::prediction_table,
    )
}
