//! # Boleta Market Data Crate
//!
//! This crate is the system's window onto market prices. It defines the
//! abstract quote gateway that the brokerage and portfolio layers consume,
//! plus the two concrete providers: the live brapi HTTP client and an
//! in-memory static provider for demos and tests.
//!
//! ## Architectural Principles
//!
//! - **Adapter Behind a Trait:** Everything upstream depends on the
//!   `QuoteGateway` trait, never on a concrete client, so the provider can
//!   be swapped without touching business logic.
//! - **Missing Symbols Are Not Failures:** A batch lookup returns the quotes
//!   it found and silently omits the rest. Only transport-level problems
//!   (network, provider outage) surface as errors.
//!
//! ## Public API
//!
//! - `QuoteGateway`: The abstract interface for fetching quotes.
//! - `BrapiClient`: The live HTTP implementation against the brapi API.
//! - `StaticQuotes`: A deterministic in-memory implementation.
//! - `MarketDataError`: The specific error types that can be returned from this crate.

use async_trait::async_trait;
use core_types::Quote;

// Declare the modules that constitute this crate.
pub mod brapi;
pub mod error;
pub mod static_quotes;

// --- Public API ---
pub use brapi::BrapiClient;
pub use error::MarketDataError;
pub use static_quotes::StaticQuotes;

/// The generic, abstract interface for a market quote provider.
/// This trait is the contract the brokerage and portfolio layers use,
/// allowing the underlying implementation (live or static) to be swapped out.
#[async_trait]
pub trait QuoteGateway: Send + Sync {
    /// Fetches the current quote for a single symbol.
    ///
    /// Errors with [`MarketDataError::SymbolNotFound`] when the provider does
    /// not know the symbol.
    async fn quote(&self, symbol: &str) -> Result<Quote, MarketDataError>;

    /// Fetches quotes for a batch of symbols.
    ///
    /// Symbols the provider does not know are omitted from the result rather
    /// than failing the whole batch.
    async fn quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, MarketDataError>;
}
