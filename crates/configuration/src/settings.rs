use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub trading: Trading,
    #[serde(default)]
    pub market_data: MarketData,
}

/// Contains the cost model applied by the execution simulator.
#[derive(Debug, Clone, Deserialize)]
pub struct Trading {
    /// The fee charged on the executed value of every fill.
    /// 0.0003 corresponds to 0.03%.
    #[serde(default = "default_fee_rate")]
    pub fee_rate: Decimal,
}

impl Default for Trading {
    fn default() -> Self {
        Self {
            fee_rate: default_fee_rate(),
        }
    }
}

fn default_fee_rate() -> Decimal {
    dec!(0.0003)
}

/// Contains the connection parameters for the external quote provider.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketData {
    /// Base URL of the quote API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token for the quote API. Usually supplied through the
    /// `BOLETA__MARKET_DATA__TOKEN` environment variable rather than the file.
    #[serde(default)]
    pub token: Option<String>,
    /// Timeout applied to each quote request, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for MarketData {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://brapi.dev/api".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_every_field() {
        let config = Config::default();
        assert_eq!(config.trading.fee_rate, dec!(0.0003));
        assert_eq!(config.market_data.base_url, "https://brapi.dev/api");
        assert_eq!(config.market_data.timeout_secs, 10);
        assert!(config.market_data.token.is_none());
    }

    #[test]
    fn partial_toml_keeps_defaults_for_the_rest() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                "[trading]\nfee_rate = \"0.001\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.trading.fee_rate, dec!(0.001));
        assert_eq!(config.market_data.timeout_secs, 10);
    }
}
