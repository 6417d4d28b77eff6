use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{
    AnalyticsSettings, Config, DatabaseSettings, LoggingSettings, OutputFormat, OutputSettings,
};

/// Prefix for environment overrides, e.g. `STOCKFOLIO__ANALYTICS__FORECAST_LOOKBACK=60`.
pub const ENV_PREFIX: &str = "STOCKFOLIO";

/// Loads the application configuration.
///
/// The TOML file at `path` is optional; any value it sets can be overridden from the
/// environment. Sections and fields that are absent fall back to their defaults.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let config = builder.try_deserialize::<Config>()?;
    validate(&config)?;

    tracing::debug!(path = %path.display(), "Configuration loaded.");
    Ok(config)
}

/// Rejects settings that would make the engine divide by zero or emit nothing.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    let analytics = &config.analytics;
    if analytics.trading_days_per_year == 0 {
        return Err(ConfigError::ValidationError(
            "analytics.trading_days_per_year must be greater than 0".to_string(),
        ));
    }
    if analytics.forecast_lookback == 0 {
        return Err(ConfigError::ValidationError(
            "analytics.forecast_lookback must be greater than 0".to_string(),
        ));
    }
    if analytics.default_horizon_days == 0 {
        return Err(ConfigError::ValidationError(
            "analytics.default_horizon_days must be greater than 0".to_string(),
        ));
    }
    if config.database.max_connections == 0 {
        return Err(ConfigError::ValidationError(
            "database.max_connections must be greater than 0".to_string(),
        ));
    }
    Ok(())
}
