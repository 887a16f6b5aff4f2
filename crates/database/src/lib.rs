//! # Boleta Database Crate
//!
//! This crate acts as a high-level, application-specific interface to the
//! ledger's backing storage. It is the system's "permanent archive."
//!
//! ## Architectural Principles
//!
//! - **Adapter Behind Traits:** The rest of the application depends on the
//!   abstract `LedgerStore` and `LedgerTx` traits. The PostgreSQL and the
//!   in-memory implementations are interchangeable, which keeps business
//!   logic testable without a live database.
//! - **Transactions Everywhere:** Every ledger mutation runs inside a
//!   `LedgerTx`. Admission, cancellation, and execution each land atomically
//!   or not at all, and `FOR UPDATE` reads serialize concurrent writers.
//! - **Asynchronous & Pooled:** All operations are asynchronous, and the
//!   PostgreSQL store uses a connection pool (`PgPool`) for high-performance,
//!   concurrent database access.
//!
//! ## Public API
//!
//! - `connect`: The async function to establish the database connection pool.
//! - `run_migrations`: A utility to apply database migrations, ensuring the schema is up-to-date.
//! - `LedgerStore` / `LedgerTx`: The abstract storage interface.
//! - `PgLedgerStore`: The PostgreSQL implementation.
//! - `MemoryLedgerStore`: The in-memory implementation for demos and tests.
//! - `StoreError`: The specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod memory;
pub mod pg;
pub mod store;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, run_migrations};
pub use error::StoreError;
pub use memory::MemoryLedgerStore;
pub use pg::PgLedgerStore;
pub use store::{LedgerStore, LedgerTx, OrderFilter};
