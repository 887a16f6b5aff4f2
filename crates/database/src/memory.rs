use async_trait::async_trait;
use chrono::Utc;
use core_types::{Account, AccountStatus, Order, Position, round_money};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::{LedgerStore, LedgerTx, OrderFilter};

#[derive(Debug, Default, Clone)]
struct MemoryState {
    accounts: HashMap<Uuid, Account>,
    orders: HashMap<Uuid, Order>,
    positions: HashMap<Uuid, Position>,
}

/// An in-memory ledger store with the same transactional contract as the
/// PostgreSQL one.
///
/// A transaction takes the single state lock and works on a scratch copy;
/// commit writes the scratch back, while rollback (or drop) discards it.
/// Holding the lock until the transaction ends is the in-memory stand-in
/// for row locking: concurrent mutations are serialized, never interleaved.
#[derive(Default, Clone)]
pub struct MemoryLedgerStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let scratch = guard.clone();
        Ok(Box::new(MemoryLedgerTx { guard, scratch }))
    }

    async fn create_account(
        &self,
        user_id: Uuid,
        account_number: &str,
        opening_balance: Decimal,
    ) -> Result<Account, StoreError> {
        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            user_id,
            account_number: account_number.to_string(),
            balance: round_money(opening_balance),
            blocked_balance: Decimal::ZERO,
            total_invested: Decimal::ZERO,
            total_profit_loss: Decimal::ZERO,
            status: AccountStatus::Active,
            max_position_size: None,
            created_at: now,
            updated_at: now,
        };
        self.state
            .lock()
            .await
            .accounts
            .insert(account.id, account.clone());
        Ok(account)
    }

    async fn account(&self, account_id: Uuid) -> Result<Account, StoreError> {
        self.state
            .lock()
            .await
            .accounts
            .get(&account_id)
            .cloned()
            .ok_or(StoreError::AccountNotFound(account_id))
    }

    async fn order(&self, order_id: Uuid) -> Result<Order, StoreError> {
        self.state
            .lock()
            .await
            .orders
            .get(&order_id)
            .cloned()
            .ok_or(StoreError::OrderNotFound(order_id))
    }

    async fn orders(
        &self,
        account_id: Uuid,
        filter: &OrderFilter,
    ) -> Result<Vec<Order>, StoreError> {
        let state = self.state.lock().await;
        let wanted_symbol = filter.symbol.as_ref().map(|s| s.trim().to_uppercase());
        let mut matches: Vec<Order> = state
            .orders
            .values()
            .filter(|order| order.account_id == account_id)
            .filter(|order| filter.status.is_none_or(|status| order.status == status))
            .filter(|order| {
                wanted_symbol
                    .as_ref()
                    .is_none_or(|symbol| &order.symbol == symbol)
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matches.truncate(filter.effective_limit() as usize);
        Ok(matches)
    }

    async fn positions(&self, account_id: Uuid) -> Result<Vec<Position>, StoreError> {
        let state = self.state.lock().await;
        let mut matches: Vec<Position> = state
            .positions
            .values()
            .filter(|position| position.account_id == account_id)
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(matches)
    }

    async fn position(
        &self,
        account_id: Uuid,
        symbol: &str,
    ) -> Result<Option<Position>, StoreError> {
        let wanted = symbol.trim().to_uppercase();
        Ok(self
            .state
            .lock()
            .await
            .positions
            .values()
            .find(|position| position.account_id == account_id && position.symbol == wanted)
            .cloned())
    }
}

pub struct MemoryLedgerTx {
    guard: OwnedMutexGuard<MemoryState>,
    scratch: MemoryState,
}

#[async_trait]
impl LedgerTx for MemoryLedgerTx {
    async fn account_for_update(&mut self, account_id: Uuid) -> Result<Account, StoreError> {
        self.scratch
            .accounts
            .get(&account_id)
            .cloned()
            .ok_or(StoreError::AccountNotFound(account_id))
    }

    async fn order_for_update(&mut self, order_id: Uuid) -> Result<Order, StoreError> {
        self.scratch
            .orders
            .get(&order_id)
            .cloned()
            .ok_or(StoreError::OrderNotFound(order_id))
    }

    async fn position_for_update(
        &mut self,
        account_id: Uuid,
        symbol: &str,
    ) -> Result<Option<Position>, StoreError> {
        let wanted = symbol.trim().to_uppercase();
        Ok(self
            .scratch
            .positions
            .values()
            .find(|position| position.account_id == account_id && position.symbol == wanted)
            .cloned())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError> {
        self.scratch.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn update_order(&mut self, order: &Order) -> Result<(), StoreError> {
        self.scratch.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn update_account(&mut self, account: &Account) -> Result<(), StoreError> {
        self.scratch.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn upsert_position(&mut self, position: &Position) -> Result<(), StoreError> {
        // Mirror the unique (account_id, symbol) constraint: replace any
        // existing row for the pair even if its id differs.
        let existing_id = self
            .scratch
            .positions
            .values()
            .find(|p| p.account_id == position.account_id && p.symbol == position.symbol)
            .map(|p| p.id);
        if let Some(id) = existing_id {
            if id != position.id {
                self.scratch.positions.remove(&id);
            }
        }
        self.scratch.positions.insert(position.id, position.clone());
        Ok(())
    }

    async fn delete_position(&mut self, position_id: Uuid) -> Result<(), StoreError> {
        self.scratch.positions.remove(&position_id);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let Self { mut guard, scratch } = *self;
        *guard = scratch;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        let Self { guard, scratch: _ } = *self;
        drop(guard);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    #[tokio::test]
    async fn commit_publishes_and_rollback_discards() {
        let store = MemoryLedgerStore::new();
        let account = store
            .create_account(Uuid::new_v4(), "ACC-0001", dec!(10000.00))
            .await
            .unwrap();

        let mut tx = store.begin().await.unwrap();
        let mut draft = tx.account_for_update(account.id).await.unwrap();
        draft.balance = dec!(9000.00);
        tx.update_account(&draft).await.unwrap();
        tx.rollback().await.unwrap();
        assert_eq!(store.account(account.id).await.unwrap().balance, dec!(10000.00));

        let mut tx = store.begin().await.unwrap();
        let mut draft = tx.account_for_update(account.id).await.unwrap();
        draft.balance = dec!(9000.00);
        tx.update_account(&draft).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(store.account(account.id).await.unwrap().balance, dec!(9000.00));
    }

    #[tokio::test]
    async fn dropping_a_transaction_discards_its_writes() {
        let store = MemoryLedgerStore::new();
        let account = store
            .create_account(Uuid::new_v4(), "ACC-0002", dec!(500.00))
            .await
            .unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            let mut draft = tx.account_for_update(account.id).await.unwrap();
            draft.balance = Decimal::ZERO;
            tx.update_account(&draft).await.unwrap();
            // Dropped here without commit.
        }

        assert_eq!(store.account(account.id).await.unwrap().balance, dec!(500.00));
    }

    #[tokio::test]
    async fn a_second_transaction_waits_for_the_first() {
        let store = MemoryLedgerStore::new();

        let tx = store.begin().await.unwrap();
        let blocked = tokio::time::timeout(Duration::from_millis(50), store.begin()).await;
        assert!(blocked.is_err(), "second begin should block until the first ends");

        tx.rollback().await.unwrap();
        let unblocked = tokio::time::timeout(Duration::from_millis(50), store.begin()).await;
        assert!(unblocked.is_ok());
    }

    #[tokio::test]
    async fn upsert_keeps_one_row_per_account_and_symbol() {
        let store = MemoryLedgerStore::new();
        let account_id = Uuid::new_v4();
        let now = Utc::now();
        let first = Position {
            id: Uuid::new_v4(),
            account_id,
            symbol: "PETR4".to_string(),
            quantity: 100,
            average_price: dec!(50.00),
            total_cost: dec!(5000.00),
            realized_pnl: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        };
        let replacement = Position {
            id: Uuid::new_v4(),
            quantity: 150,
            ..first.clone()
        };

        let mut tx = store.begin().await.unwrap();
        tx.upsert_position(&first).await.unwrap();
        tx.upsert_position(&replacement).await.unwrap();
        tx.commit().await.unwrap();

        let positions = store.positions(account_id).await.unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].quantity, 150);
    }
}
