//! # Boleta Core Types Crate
//!
//! This crate is the shared vocabulary of the system. It defines the plain
//! data structures and enums that every other crate speaks: accounts, orders,
//! positions, and quotes.
//!
//! ## Architectural Principles
//!
//! - **Layer 0 Foundation:** This crate sits at the bottom of the dependency
//!   graph. It depends on nothing else in the workspace, and everything else
//!   depends on it.
//! - **Logic-Free Data:** Types here carry data and cheap derived accessors
//!   (e.g. `Account::available_balance`). Business rules such as admission
//!   checks or fill arithmetic live in the `brokerage` crate.
//! - **Exact Money:** All monetary values are `rust_decimal::Decimal`.
//!   Floating point never touches a balance.
//!
//! ## Public API
//!
//! - `Account`, `Order`, `Position`, `Quote`: The persistent ledger records.
//! - `OrderRequest`: The validated intent to trade, before it becomes an `Order`.
//! - `OrderSide`, `OrderType`, `OrderStatus`, `AccountStatus`, `TimeInForce`:
//!   The closed sets of states these records move through.
//! - `round_money`: The single rounding rule applied at persistence boundaries.
//! - `CoreError`: The specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod enums;
pub mod error;
pub mod money;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{AccountStatus, OrderSide, OrderStatus, OrderType, TimeInForce};
pub use error::CoreError;
pub use money::round_money;
pub use structs::{Account, Order, OrderRequest, Position, Quote};
