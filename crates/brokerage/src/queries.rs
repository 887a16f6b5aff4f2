use std::sync::Arc;

use core_types::Order;
use database::{LedgerStore, OrderFilter};
use uuid::Uuid;

use crate::error::BrokerageError;

/// Read-side order lookups, scoped to a single account.
pub struct OrderQueries {
    store: Arc<dyn LedgerStore>,
}

impl OrderQueries {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Fetches one order. An order owned by a different account reports as
    /// not found rather than leaking its existence.
    pub async fn order(&self, order_id: Uuid, account_id: Uuid) -> Result<Order, BrokerageError> {
        let order = self.store.order(order_id).await?;
        if order.account_id != account_id {
            return Err(BrokerageError::OrderNotFound(order_id));
        }
        Ok(order)
    }

    /// Lists an account's orders, newest first, honouring the filter's
    /// status, symbol and limit.
    pub async fn orders(
        &self,
        account_id: Uuid,
        filter: &OrderFilter,
    ) -> Result<Vec<Order>, BrokerageError> {
        let orders = self.store.orders(account_id, filter).await?;
        Ok(orders)
    }
}
