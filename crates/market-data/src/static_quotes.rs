use async_trait::async_trait;
use chrono::Utc;
use core_types::Quote;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::QuoteGateway;
use crate::error::MarketDataError;

/// A deterministic, in-memory `QuoteGateway`.
///
/// Demos and tests seed it with fixed prices so that ledger arithmetic can be
/// asserted exactly, without a network in the loop.
#[derive(Default)]
pub struct StaticQuotes {
    quotes: RwLock<HashMap<String, Quote>>,
}

impl StaticQuotes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets (or replaces) the price for a symbol.
    pub async fn set_price(&self, symbol: &str, price: Decimal) {
        let symbol = symbol.trim().to_uppercase();
        let quote = Quote {
            symbol: symbol.clone(),
            price,
            previous_close: None,
            day_high: None,
            day_low: None,
            volume: None,
            updated_at: Utc::now(),
        };
        self.quotes.write().await.insert(symbol, quote);
    }

    /// Stores a full quote as-is, keyed by its symbol.
    pub async fn insert(&self, quote: Quote) {
        self.quotes.write().await.insert(quote.symbol.clone(), quote);
    }

    /// Forgets a symbol, so later lookups treat it as unknown.
    pub async fn remove(&self, symbol: &str) {
        self.quotes.write().await.remove(&symbol.trim().to_uppercase());
    }
}

#[async_trait]
impl QuoteGateway for StaticQuotes {
    async fn quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let wanted = symbol.trim().to_uppercase();
        self.quotes
            .read()
            .await
            .get(&wanted)
            .cloned()
            .ok_or(MarketDataError::SymbolNotFound(wanted))
    }

    async fn quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, MarketDataError> {
        let map = self.quotes.read().await;
        Ok(symbols
            .iter()
            .filter_map(|s| map.get(&s.trim().to_uppercase()).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn batch_lookup_omits_unknown_symbols() {
        let quotes = StaticQuotes::new();
        quotes.set_price("PETR4", dec!(38.52)).await;

        let batch = quotes
            .quotes(&["PETR4".to_string(), "VALE3".to_string()])
            .await
            .unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].symbol, "PETR4");
    }

    #[tokio::test]
    async fn single_lookup_errors_on_unknown_symbols() {
        let quotes = StaticQuotes::new();
        quotes.set_price("petr4", dec!(38.52)).await;

        // Lookups are case-insensitive.
        assert!(quotes.quote("PETR4").await.is_ok());

        let err = quotes.quote("VALE3").await.unwrap_err();
        assert!(matches!(err, MarketDataError::SymbolNotFound(s) if s == "VALE3"));
    }

    #[tokio::test]
    async fn removed_symbols_become_unknown() {
        let quotes = StaticQuotes::new();
        quotes.set_price("VALE3", dec!(61.20)).await;
        quotes.remove("VALE3").await;
        assert!(quotes.quote("VALE3").await.is_err());
    }
}
