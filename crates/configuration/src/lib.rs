use crate::error::ConfigError;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{Config, MarketData, Trading};

/// Loads the application configuration from the `config.toml` file.
///
/// This function is the primary entry point for this crate. It reads the configuration file,
/// deserializes it into our strongly-typed `Config` struct, and returns it. The file is
/// optional: every field has a sensible default, and any value can be overridden through
/// `BOLETA__`-prefixed environment variables (e.g. `BOLETA__MARKET_DATA__TOKEN`).
pub fn load_config() -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        // Tells the builder to look for a file named `config.toml`
        .add_source(config::File::with_name("config.toml").required(false))
        // Environment variables take precedence over the file.
        .add_source(config::Environment::with_prefix("BOLETA").separator("__"))
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    validate(&config)?;

    Ok(config)
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    let fee = config.trading.fee_rate;
    if fee < rust_decimal::Decimal::ZERO || fee >= rust_decimal::Decimal::ONE {
        return Err(ConfigError::Invalid(format!(
            "trading.fee_rate must be in [0, 1), got {fee}"
        )));
    }
    if config.market_data.base_url.is_empty() {
        return Err(ConfigError::Invalid(
            "market_data.base_url must not be empty".to_string(),
        ));
    }
    Ok(())
}
