use async_trait::async_trait;
use core_types::{Account, Order, OrderStatus, Position};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::StoreError;

/// Narrowing criteria for order listings. The default filter returns the
/// most recent 100 orders regardless of state.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub symbol: Option<String>,
    pub limit: Option<i64>,
}

impl OrderFilter {
    pub const DEFAULT_LIMIT: i64 = 100;

    pub fn effective_limit(&self) -> i64 {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT).max(0)
    }
}

/// The abstract interface to the ledger's backing storage.
///
/// Plain reads go through the store directly. Every mutation happens inside
/// a [`LedgerTx`], so that an admission, cancellation, or execution either
/// lands completely or not at all.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Opens a transaction. Dropping the returned handle without calling
    /// `commit` discards every change made through it.
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError>;

    /// Creates a fresh account with an opening cash balance.
    async fn create_account(
        &self,
        user_id: Uuid,
        account_number: &str,
        opening_balance: Decimal,
    ) -> Result<Account, StoreError>;

    async fn account(&self, account_id: Uuid) -> Result<Account, StoreError>;

    async fn order(&self, order_id: Uuid) -> Result<Order, StoreError>;

    /// Lists an account's orders, newest first, narrowed by the filter.
    async fn orders(&self, account_id: Uuid, filter: &OrderFilter)
    -> Result<Vec<Order>, StoreError>;

    /// Lists an account's open positions, ordered by symbol.
    async fn positions(&self, account_id: Uuid) -> Result<Vec<Position>, StoreError>;

    async fn position(
        &self,
        account_id: Uuid,
        symbol: &str,
    ) -> Result<Option<Position>, StoreError>;
}

/// A single atomic unit of ledger work.
///
/// The `_for_update` reads take row locks (or the in-memory equivalent), so
/// two transactions mutating the same account are serialized rather than
/// interleaved.
#[async_trait]
pub trait LedgerTx: Send {
    async fn account_for_update(&mut self, account_id: Uuid) -> Result<Account, StoreError>;

    async fn order_for_update(&mut self, order_id: Uuid) -> Result<Order, StoreError>;

    async fn position_for_update(
        &mut self,
        account_id: Uuid,
        symbol: &str,
    ) -> Result<Option<Position>, StoreError>;

    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError>;

    async fn update_order(&mut self, order: &Order) -> Result<(), StoreError>;

    async fn update_account(&mut self, account: &Account) -> Result<(), StoreError>;

    /// Inserts the position, or replaces the row already holding its
    /// `(account_id, symbol)` pair.
    async fn upsert_position(&mut self, position: &Position) -> Result<(), StoreError>;

    async fn delete_position(&mut self, position_id: Uuid) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
