//! # Boleta Brokerage Crate
//!
//! This crate is the order-execution core of the system. It admits new orders
//! against account balances and holdings, cancels resting orders, and settles
//! fills through a simulated execution engine that moves cash, reservations
//! and positions in a single atomic step.
//!
//! ## Architectural Principles
//!
//! - **Arithmetic vs. Orchestration:** The `ledger` module is a set of pure
//!   functions that compute the full effect of a fill (values, fees, new
//!   balances, position changes) without touching storage. The services in
//!   `admission`, `lifecycle` and `execution` orchestrate transactions and
//!   delegate every balance calculation to it. This keeps the money math
//!   testable without a database.
//! - **Storage Abstraction:** All services operate on `Arc<dyn LedgerStore>`
//!   and `Arc<dyn QuoteGateway>`, so the same order flow runs against
//!   Postgres with live quotes or against the in-memory store with pinned
//!   prices in tests.
//! - **All-or-Nothing Writes:** Every operation that touches more than one
//!   row does so inside one store transaction. A failed quote fetch, an
//!   exhausted balance or a lost race leaves the ledger untouched.
//!
//! ## Public API
//!
//! - `OrderAdmission`: Validates and admits new orders, reserving buy funds.
//! - `OrderLifecycle`: Cancels resting orders and releases reservations.
//! - `ExecutionSimulator`: Fills active orders at quote or limit price.
//! - `OrderQueries`: Read-side lookups for single orders and order lists.
//! - `BrokerageError`: The specific error types returned from this crate.

pub mod admission;
pub mod error;
pub mod execution;
pub mod ledger;
pub mod lifecycle;
pub mod queries;

pub use admission::OrderAdmission;
pub use error::BrokerageError;
pub use execution::ExecutionSimulator;
pub use ledger::{FillEffect, PositionChange};
pub use lifecycle::OrderLifecycle;
pub use queries::OrderQueries;
