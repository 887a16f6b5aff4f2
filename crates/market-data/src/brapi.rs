use async_trait::async_trait;
use chrono::{DateTime, Utc};
use configuration::MarketData;
use core_types::Quote;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

use crate::QuoteGateway;
use crate::error::MarketDataError;

/// A concrete implementation of the `QuoteGateway` for the brapi API,
/// which serves delayed B3 quotes over plain HTTPS.
#[derive(Clone)]
pub struct BrapiClient {
    client: reqwest::Client,
    base_url: String,
}

impl BrapiClient {
    pub fn new(settings: &MarketData) -> Result<Self, MarketDataError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &settings.token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| MarketDataError::InvalidToken)?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// One round trip to `/quote/{SYM1,SYM2,...}`. Symbols the provider does
    /// not know, and results without a market price, are dropped here.
    async fn fetch_batch(&self, symbols: &[String]) -> Result<Vec<Quote>, MarketDataError> {
        let joined = symbols
            .iter()
            .map(|s| s.trim().to_uppercase())
            .collect::<Vec<_>>()
            .join(",");
        let url = format!("{}/quote/{}", self.base_url, joined);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ProviderErrorResponse>(&text)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or(text);
            return Err(MarketDataError::Provider(status.as_u16(), message));
        }

        let parsed: QuoteListResponse = serde_json::from_str(&text)
            .map_err(|e| MarketDataError::Deserialization(e.to_string()))?;

        Ok(parsed
            .results
            .into_iter()
            .filter_map(RawQuote::into_quote)
            .collect())
    }
}

#[async_trait]
impl QuoteGateway for BrapiClient {
    async fn quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let wanted = symbol.trim().to_uppercase();
        let batch = self.fetch_batch(std::slice::from_ref(&wanted)).await?;
        batch
            .into_iter()
            .find(|q| q.symbol == wanted)
            .ok_or(MarketDataError::SymbolNotFound(wanted))
    }

    async fn quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, MarketDataError> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }
        self.fetch_batch(symbols).await
    }
}

#[derive(Deserialize)]
struct QuoteListResponse {
    #[serde(default)]
    results: Vec<RawQuote>,
}

#[derive(Deserialize)]
struct ProviderErrorResponse {
    message: Option<String>,
}

// Intermediate struct for deserializing quote results from the brapi API.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuote {
    symbol: String,
    regular_market_price: Option<Decimal>,
    regular_market_previous_close: Option<Decimal>,
    regular_market_day_high: Option<Decimal>,
    regular_market_day_low: Option<Decimal>,
    regular_market_volume: Option<i64>,
    regular_market_time: Option<DateTime<Utc>>,
}

impl RawQuote {
    fn into_quote(self) -> Option<Quote> {
        let price = self.regular_market_price?;
        Some(Quote {
            symbol: self.symbol.to_uppercase(),
            price,
            previous_close: self.regular_market_previous_close,
            day_high: self.regular_market_day_high,
            day_low: self.regular_market_day_low,
            volume: self.regular_market_volume,
            updated_at: self.regular_market_time.unwrap_or_else(Utc::now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_a_brapi_result_payload() {
        let payload = r#"{
            "results": [
                {
                    "symbol": "PETR4",
                    "regularMarketPrice": 38.52,
                    "regularMarketPreviousClose": 38.10,
                    "regularMarketDayHigh": 38.90,
                    "regularMarketDayLow": 37.95,
                    "regularMarketVolume": 51234400,
                    "regularMarketTime": "2024-05-10T17:59:00.000Z"
                },
                {
                    "symbol": "XXXX9",
                    "regularMarketPrice": null
                }
            ]
        }"#;

        let parsed: QuoteListResponse = serde_json::from_str(payload).unwrap();
        let quotes: Vec<Quote> = parsed
            .results
            .into_iter()
            .filter_map(RawQuote::into_quote)
            .collect();

        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].symbol, "PETR4");
        assert_eq!(quotes[0].price, dec!(38.52));
        assert_eq!(quotes[0].previous_close, Some(dec!(38.10)));
        assert_eq!(quotes[0].volume, Some(51234400));
    }

    #[test]
    fn a_payload_without_results_parses_to_an_empty_batch() {
        let parsed: QuoteListResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.results.is_empty());
    }
}
