use std::sync::Arc;

use chrono::Utc;
use core_types::{Order, OrderStatus, round_money};
use database::LedgerStore;
use uuid::Uuid;

use crate::error::BrokerageError;

/// Cancels orders that have not yet finished filling.
pub struct OrderLifecycle {
    store: Arc<dyn LedgerStore>,
}

impl OrderLifecycle {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Cancels a pending or partially filled order and releases whatever the
    /// admission reserved for it. Funds never released beyond the account's
    /// current blocked balance.
    pub async fn cancel_order(
        &self,
        order_id: Uuid,
        account_id: Uuid,
    ) -> Result<Order, BrokerageError> {
        let mut tx = self.store.begin().await?;

        let mut order = tx.order_for_update(order_id).await?;
        if order.account_id != account_id {
            // Orders belonging to someone else are indistinguishable from
            // orders that do not exist.
            return Err(BrokerageError::OrderNotFound(order_id));
        }
        if !order.is_active() {
            return Err(BrokerageError::OrderNotCancellable(order_id, order.status));
        }

        let now = Utc::now();
        if order.reserved_amount > rust_decimal::Decimal::ZERO {
            let mut account = tx.account_for_update(account_id).await?;
            let released = order.reserved_amount.min(account.blocked_balance);
            account.blocked_balance = round_money(account.blocked_balance - released);
            account.updated_at = now;
            tx.update_account(&account).await?;
        }

        order.status = OrderStatus::Cancelled;
        order.cancelled_at = Some(now);
        order.updated_at = now;
        tx.update_order(&order).await?;
        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            account_id = %account_id,
            symbol = %order.symbol,
            released = %order.reserved_amount,
            "order cancelled"
        );
        Ok(order)
    }
}
