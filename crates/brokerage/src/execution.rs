use std::sync::Arc;

use chrono::Utc;
use configuration::Trading;
use core_types::{Order, OrderSide, OrderStatus, OrderType};
use database::LedgerStore;
use market_data::QuoteGateway;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::BrokerageError;
use crate::ledger::{self, PositionChange};

/// Simulated fill engine.
///
/// Fills an active order in full at a single price: the live quote for
/// market and stop orders, the limit price otherwise. The order, the
/// account balances and the position all move in one transaction, so a
/// failed quote or an exhausted balance leaves the ledger exactly as it
/// was.
pub struct ExecutionSimulator {
    store: Arc<dyn LedgerStore>,
    quotes: Arc<dyn QuoteGateway>,
    fee_rate: Decimal,
}

impl ExecutionSimulator {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        quotes: Arc<dyn QuoteGateway>,
        trading: &Trading,
    ) -> Self {
        Self {
            store,
            quotes,
            fee_rate: trading.fee_rate,
        }
    }

    pub async fn execute_order(&self, order_id: Uuid) -> Result<Order, BrokerageError> {
        // --- 1. Peek at the order and fetch the quote outside the lock ---
        let peek = self.store.order(order_id).await?;
        if !peek.is_active() {
            return Err(BrokerageError::OrderNotActive(order_id, peek.status));
        }
        let quote = self.quotes.quote(&peek.symbol).await?;

        // --- 2. Lock the order and re-check its state ---
        let mut tx = self.store.begin().await?;
        let mut order = tx.order_for_update(order_id).await?;
        if !order.is_active() {
            return Err(BrokerageError::OrderNotActive(order_id, order.status));
        }
        let execution_price = execution_price(&order, quote.price)?;

        // --- 3. Apply the fill to account and position ---
        let account = tx.account_for_update(order.account_id).await?;
        let position = tx.position_for_update(order.account_id, &order.symbol).await?;
        let now = Utc::now();
        let effect = match order.side {
            OrderSide::Buy => ledger::buy_fill(
                &account,
                position.as_ref(),
                &order,
                execution_price,
                self.fee_rate,
                now,
            )?,
            OrderSide::Sell => ledger::sell_fill(
                &account,
                position.as_ref(),
                &order,
                execution_price,
                self.fee_rate,
                now,
            )?,
        };

        // --- 4. Persist everything atomically ---
        order.status = OrderStatus::Filled;
        order.filled_quantity = order.quantity;
        order.total_executed_value = effect.executed_value;
        order.fees = effect.fee;
        order.executed_at = Some(now);
        order.updated_at = now;
        tx.update_order(&order).await?;
        tx.update_account(&effect.account).await?;
        match effect.position {
            PositionChange::Upsert(position) => tx.upsert_position(&position).await?,
            PositionChange::Remove(position_id) => tx.delete_position(position_id).await?,
        }
        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            account_id = %order.account_id,
            symbol = %order.symbol,
            side = %order.side,
            price = %execution_price,
            executed_value = %order.total_executed_value,
            fees = %order.fees,
            "order executed"
        );
        Ok(order)
    }
}

/// The single price a fill settles at. Market and stop orders take the
/// live quote; limit and stop-limit orders settle at their limit price.
fn execution_price(order: &Order, quote_price: Decimal) -> Result<Decimal, BrokerageError> {
    match order.order_type {
        OrderType::Market | OrderType::Stop => Ok(quote_price),
        OrderType::Limit | OrderType::StopLimit => order.limit_price.ok_or_else(|| {
            BrokerageError::InvalidOrder(format!(
                "order {} is a {} order without a limit price",
                order.id, order.order_type
            ))
        }),
    }
}
