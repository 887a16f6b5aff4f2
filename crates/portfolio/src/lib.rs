//! # Boleta Portfolio Crate
//!
//! This crate turns raw ledger state into the valuation views a dashboard
//! needs: marked positions, a portfolio summary, cash-versus-stocks
//! allocation, concentration metrics and period performance.
//!
//! ## Architectural Principles
//!
//! - **Pure Reads:** Nothing in this crate mutates the ledger. The
//!   aggregator loads state through `LedgerStore` reads and marks it against
//!   one batch `QuoteGateway` call, so a view is cheap to recompute and safe
//!   to serve concurrently with trading.
//! - **Advisory Consistency:** Views are dashboards, not settlement. A
//!   symbol whose quote is momentarily unavailable is skipped from the
//!   totals and surfaced in `missing_quotes` instead of failing the view.
//!
//! ## Public API
//!
//! - `PortfolioAggregator`: Produces all of the views below.
//! - `PositionView`, `PortfolioSummary`, `Allocation`, `Diversification`,
//!   `Performance`: The serializable view structs.
//! - `Period`: The reporting window for the performance view.
//! - `PortfolioError`: The specific error types returned from this crate.

pub mod aggregator;
pub mod error;
pub mod views;

pub use aggregator::PortfolioAggregator;
pub use error::PortfolioError;
pub use views::{
    Allocation, AllocationSlice, Diversification, EquityPoint, LargestPosition, Performance,
    Period, PortfolioSummary, PositionView, StockAllocation, SymbolAllocation,
};
