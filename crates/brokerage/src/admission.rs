use std::sync::Arc;

use chrono::Utc;
use core_types::{Order, OrderRequest, OrderSide, OrderStatus, round_money};
use database::LedgerStore;
use market_data::QuoteGateway;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::BrokerageError;

/// Validates and admits new orders.
///
/// A successful admission leaves exactly one new `pending` Order row behind,
/// plus (for buys) the matching balance reservation. Any failure leaves the
/// ledger untouched.
pub struct OrderAdmission {
    store: Arc<dyn LedgerStore>,
    quotes: Arc<dyn QuoteGateway>,
}

impl OrderAdmission {
    pub fn new(store: Arc<dyn LedgerStore>, quotes: Arc<dyn QuoteGateway>) -> Self {
        Self { store, quotes }
    }

    pub async fn place_order(
        &self,
        account_id: Uuid,
        request: &OrderRequest,
    ) -> Result<Order, BrokerageError> {
        // --- 1. The account must exist and be active ---
        let account = self.store.account(account_id).await?;
        if !account.is_active() {
            return Err(BrokerageError::AccountInactive(account_id));
        }

        // --- 2. The symbol must have a live quote ---
        // Fetched before the transaction opens so a slow gateway never sits
        // inside the locked scope.
        let symbol = request.symbol().trim().to_uppercase();
        let quote = self.quotes.quote(&symbol).await?;

        // --- 3. Validate the request ---
        validate_request(request)?;
        let reference = reference_price(request, quote.price);
        let order_value = round_money(reference * Decimal::from(request.quantity()));
        if let Some(limit) = account.max_position_size {
            if order_value > limit {
                return Err(BrokerageError::LimitExceeded {
                    value: order_value,
                    limit,
                });
            }
        }

        // --- 4. Reserve funds or verify shares, atomically with the insert ---
        let mut tx = self.store.begin().await?;
        let mut account = tx.account_for_update(account_id).await?;
        if !account.is_active() {
            return Err(BrokerageError::AccountInactive(account_id));
        }

        let now = Utc::now();
        let mut reserved = Decimal::ZERO;
        match request.side() {
            OrderSide::Buy => {
                reserved = order_value;
                if reserved > account.available_balance() {
                    return Err(BrokerageError::InsufficientFunds {
                        available: account.available_balance(),
                        required: reserved,
                    });
                }
                account.blocked_balance = round_money(account.blocked_balance + reserved);
                account.updated_at = now;
                tx.update_account(&account).await?;
            }
            OrderSide::Sell => {
                let held = tx
                    .position_for_update(account_id, &symbol)
                    .await?
                    .map_or(0, |p| p.quantity);
                if held < request.quantity() {
                    return Err(BrokerageError::InsufficientShares {
                        symbol,
                        held,
                        requested: request.quantity(),
                    });
                }
            }
        }

        // --- 5. Insert the pending order and commit ---
        let order = Order {
            id: Uuid::new_v4(),
            account_id,
            symbol,
            side: request.side(),
            order_type: request.order_type(),
            quantity: request.quantity(),
            limit_price: request.limit_price(),
            stop_price: request.stop_price(),
            status: OrderStatus::Pending,
            filled_quantity: 0,
            total_executed_value: Decimal::ZERO,
            fees: Decimal::ZERO,
            reserved_amount: reserved,
            time_in_force: request.time_in_force(),
            executed_at: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        };
        tx.insert_order(&order).await?;
        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            account_id = %account_id,
            symbol = %order.symbol,
            side = %order.side,
            quantity = order.quantity,
            reserved = %order.reserved_amount,
            "order admitted"
        );
        Ok(order)
    }
}

fn validate_request(request: &OrderRequest) -> Result<(), BrokerageError> {
    if request.quantity() <= 0 {
        return Err(BrokerageError::InvalidOrder(
            "quantity must be a positive whole number of shares".to_string(),
        ));
    }
    if let Some(limit_price) = request.limit_price() {
        if limit_price <= Decimal::ZERO {
            return Err(BrokerageError::InvalidOrder(
                "limit price must be positive".to_string(),
            ));
        }
    }
    if let Some(stop_price) = request.stop_price() {
        if stop_price <= Decimal::ZERO {
            return Err(BrokerageError::InvalidOrder(
                "stop price must be positive".to_string(),
            ));
        }
    }
    Ok(())
}

/// The price an admission reasons with before any fill exists: the live
/// quote for market orders, the limit price where one is given, and the
/// trigger price for plain stop orders (which carry no limit price).
fn reference_price(request: &OrderRequest, quote_price: Decimal) -> Decimal {
    match request {
        OrderRequest::Market { .. } => quote_price,
        OrderRequest::Limit { limit_price, .. } | OrderRequest::StopLimit { limit_price, .. } => {
            *limit_price
        }
        OrderRequest::Stop { stop_price, .. } => *stop_price,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::TimeInForce;
    use rust_decimal_macros::dec;

    fn market_buy(quantity: i64) -> OrderRequest {
        OrderRequest::Market {
            symbol: "PETR4".to_string(),
            side: OrderSide::Buy,
            quantity,
            time_in_force: TimeInForce::Day,
        }
    }

    #[test]
    fn requests_with_non_positive_quantities_are_invalid() {
        assert!(matches!(
            validate_request(&market_buy(0)),
            Err(BrokerageError::InvalidOrder(_))
        ));
        assert!(matches!(
            validate_request(&market_buy(-3)),
            Err(BrokerageError::InvalidOrder(_))
        ));
        assert!(validate_request(&market_buy(1)).is_ok());
    }

    #[test]
    fn requests_with_non_positive_prices_are_invalid() {
        let bad_limit = OrderRequest::Limit {
            symbol: "PETR4".to_string(),
            side: OrderSide::Buy,
            quantity: 10,
            limit_price: dec!(0.00),
            time_in_force: TimeInForce::Day,
        };
        assert!(matches!(
            validate_request(&bad_limit),
            Err(BrokerageError::InvalidOrder(_))
        ));

        let bad_stop = OrderRequest::Stop {
            symbol: "PETR4".to_string(),
            side: OrderSide::Sell,
            quantity: 10,
            stop_price: dec!(-1.00),
            time_in_force: TimeInForce::Day,
        };
        assert!(matches!(
            validate_request(&bad_stop),
            Err(BrokerageError::InvalidOrder(_))
        ));
    }

    #[test]
    fn reference_price_follows_the_order_kind() {
        let quote = dec!(38.52);
        assert_eq!(reference_price(&market_buy(10), quote), quote);

        let limit = OrderRequest::Limit {
            symbol: "PETR4".to_string(),
            side: OrderSide::Buy,
            quantity: 10,
            limit_price: dec!(37.00),
            time_in_force: TimeInForce::Day,
        };
        assert_eq!(reference_price(&limit, quote), dec!(37.00));

        let stop = OrderRequest::Stop {
            symbol: "PETR4".to_string(),
            side: OrderSide::Sell,
            quantity: 10,
            stop_price: dec!(36.00),
            time_in_force: TimeInForce::Day,
        };
        assert_eq!(reference_price(&stop, quote), dec!(36.00));

        let stop_limit = OrderRequest::StopLimit {
            symbol: "PETR4".to_string(),
            side: OrderSide::Buy,
            quantity: 10,
            limit_price: dec!(39.00),
            stop_price: dec!(38.80),
            time_in_force: TimeInForce::Day,
        };
        assert_eq!(reference_price(&stop_limit, quote), dec!(39.00));
    }
}
