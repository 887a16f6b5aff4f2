//! Pure fill arithmetic. Given the rows a transaction has already locked,
//! these functions compute the updated account and position without touching
//! storage, so the money math is testable on its own.

use chrono::{DateTime, Utc};
use core_types::{Account, Order, Position, round_money};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::BrokerageError;

/// The ledger deltas produced by settling one full fill.
#[derive(Debug, Clone)]
pub struct FillEffect {
    pub executed_value: Decimal,
    pub fee: Decimal,
    pub account: Account,
    pub position: PositionChange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PositionChange {
    Upsert(Position),
    Remove(Uuid),
}

/// Settles a buy fill: debit cash, release the admission reservation, and
/// re-average the position (fees are part of cost basis).
///
/// The reservation was computed from the reference price at admission time,
/// so the actual cost can exceed it. The fill is refused when the account
/// cannot cover the difference, leaving every row untouched.
pub fn buy_fill(
    account: &Account,
    position: Option<&Position>,
    order: &Order,
    execution_price: Decimal,
    fee_rate: Decimal,
    now: DateTime<Utc>,
) -> Result<FillEffect, BrokerageError> {
    let quantity = Decimal::from(order.quantity);
    let executed_value = round_money(execution_price * quantity);
    let fee = round_money(executed_value * fee_rate);
    let total_cost = executed_value + fee;

    let released = order.reserved_amount.min(account.blocked_balance);
    let new_balance = account.balance - total_cost;
    let new_blocked = account.blocked_balance - released;
    if new_balance < new_blocked {
        return Err(BrokerageError::InsufficientFunds {
            available: account.balance - new_blocked,
            required: total_cost,
        });
    }

    let mut account = account.clone();
    account.balance = round_money(new_balance);
    account.blocked_balance = round_money(new_blocked);
    account.updated_at = now;

    let position = match position {
        Some(existing) => {
            let new_quantity = existing.quantity + order.quantity;
            let new_total_cost = round_money(existing.total_cost + total_cost);
            let new_average = round_money(new_total_cost / Decimal::from(new_quantity));
            Position {
                quantity: new_quantity,
                average_price: new_average,
                total_cost: new_total_cost,
                updated_at: now,
                ..existing.clone()
            }
        }
        None => Position {
            id: Uuid::new_v4(),
            account_id: account.id,
            symbol: order.symbol.clone(),
            quantity: order.quantity,
            average_price: execution_price,
            total_cost,
            realized_pnl: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        },
    };

    Ok(FillEffect {
        executed_value,
        fee,
        account,
        position: PositionChange::Upsert(position),
    })
}

/// Settles a sell fill: credit cash net of fees and realize P&L against the
/// weighted-average cost. A position that reaches zero quantity is removed,
/// rolling its lifetime realized P&L into the account's running total.
///
/// Admission verified share availability, but concurrent sells can both pass
/// that check, so the held quantity is re-validated here against the locked
/// row.
pub fn sell_fill(
    account: &Account,
    position: Option<&Position>,
    order: &Order,
    execution_price: Decimal,
    fee_rate: Decimal,
    now: DateTime<Utc>,
) -> Result<FillEffect, BrokerageError> {
    let held = position.map_or(0, |p| p.quantity);
    if held < order.quantity {
        return Err(BrokerageError::InsufficientShares {
            symbol: order.symbol.clone(),
            held,
            requested: order.quantity,
        });
    }
    // held >= quantity >= 1, so the position exists.
    let position = match position {
        Some(p) => p,
        None => {
            return Err(BrokerageError::InsufficientShares {
                symbol: order.symbol.clone(),
                held: 0,
                requested: order.quantity,
            });
        }
    };

    let quantity = Decimal::from(order.quantity);
    let executed_value = round_money(execution_price * quantity);
    let fee = round_money(executed_value * fee_rate);
    let revenue = executed_value - fee;
    let realized_delta = round_money((execution_price - position.average_price) * quantity - fee);

    let mut account = account.clone();
    account.balance = round_money(account.balance + revenue);
    account.updated_at = now;

    let new_quantity = position.quantity - order.quantity;
    let change = if new_quantity == 0 {
        account.total_profit_loss =
            round_money(account.total_profit_loss + position.realized_pnl + realized_delta);
        PositionChange::Remove(position.id)
    } else {
        PositionChange::Upsert(Position {
            quantity: new_quantity,
            total_cost: round_money(position.average_price * Decimal::from(new_quantity)),
            realized_pnl: round_money(position.realized_pnl + realized_delta),
            updated_at: now,
            ..position.clone()
        })
    };

    Ok(FillEffect {
        executed_value,
        fee,
        account,
        position: change,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{AccountStatus, OrderSide, OrderStatus, OrderType, TimeInForce};
    use rust_decimal_macros::dec;

    const FEE_RATE: Decimal = dec!(0.0003);

    fn account(balance: Decimal, blocked: Decimal) -> Account {
        let now = Utc::now();
        Account {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            account_number: "ACC-1000".to_string(),
            balance,
            blocked_balance: blocked,
            total_invested: Decimal::ZERO,
            total_profit_loss: Decimal::ZERO,
            status: AccountStatus::Active,
            max_position_size: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn order(side: OrderSide, quantity: i64, reserved: Decimal) -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            symbol: "XYZW3".to_string(),
            side,
            order_type: OrderType::Market,
            quantity,
            limit_price: None,
            stop_price: None,
            status: OrderStatus::Pending,
            filled_quantity: 0,
            total_executed_value: Decimal::ZERO,
            fees: Decimal::ZERO,
            reserved_amount: reserved,
            time_in_force: TimeInForce::Day,
            executed_at: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn position(quantity: i64, average: Decimal, total_cost: Decimal) -> Position {
        let now = Utc::now();
        Position {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            symbol: "XYZW3".to_string(),
            quantity,
            average_price: average,
            total_cost,
            realized_pnl: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn first_buy_creates_the_position_at_the_execution_price() {
        let account = account(dec!(10000.00), dec!(5000.00));
        let order = order(OrderSide::Buy, 100, dec!(5000.00));

        let effect = buy_fill(&account, None, &order, dec!(50.00), FEE_RATE, Utc::now()).unwrap();

        assert_eq!(effect.executed_value, dec!(5000.00));
        assert_eq!(effect.fee, dec!(1.50));
        assert_eq!(effect.account.balance, dec!(4998.50));
        assert_eq!(effect.account.blocked_balance, dec!(0.00));
        match effect.position {
            PositionChange::Upsert(p) => {
                assert_eq!(p.quantity, 100);
                assert_eq!(p.average_price, dec!(50.00));
                assert_eq!(p.total_cost, dec!(5001.50));
                assert_eq!(p.realized_pnl, Decimal::ZERO);
            }
            PositionChange::Remove(_) => panic!("expected an upsert"),
        }
    }

    #[test]
    fn a_second_buy_blends_the_average_cost() {
        let account = account(dec!(20000.00), dec!(6000.00));
        let existing = position(100, dec!(50.00), dec!(5001.50));
        let order = order(OrderSide::Buy, 100, dec!(6000.00));

        let effect = buy_fill(
            &account,
            Some(&existing),
            &order,
            dec!(60.00),
            FEE_RATE,
            Utc::now(),
        )
        .unwrap();

        // 6000.00 executed + 1.80 fee on top of the prior 5001.50 basis.
        assert_eq!(effect.fee, dec!(1.80));
        match effect.position {
            PositionChange::Upsert(p) => {
                assert_eq!(p.quantity, 200);
                assert_eq!(p.total_cost, dec!(11003.30));
                assert_eq!(p.average_price, dec!(55.02));
            }
            PositionChange::Remove(_) => panic!("expected an upsert"),
        }
    }

    #[test]
    fn buy_release_never_drives_blocked_below_zero() {
        // The admission reservation was partially released out-of-band; the
        // fill may only release what is still blocked.
        let account = account(dec!(10000.00), dec!(3000.00));
        let order = order(OrderSide::Buy, 50, dec!(5000.00));

        let effect = buy_fill(&account, None, &order, dec!(50.00), FEE_RATE, Utc::now()).unwrap();

        assert_eq!(effect.account.blocked_balance, Decimal::ZERO);
        assert!(effect.account.balance >= effect.account.blocked_balance);
    }

    #[test]
    fn buy_fill_refuses_costs_the_account_cannot_cover() {
        // Reserved at 50.00 but the market moved; fee on top of a full-balance
        // reservation cannot be paid.
        let account = account(dec!(5000.00), dec!(5000.00));
        let order = order(OrderSide::Buy, 100, dec!(5000.00));

        let err = buy_fill(&account, None, &order, dec!(50.00), FEE_RATE, Utc::now()).unwrap_err();
        assert!(matches!(err, BrokerageError::InsufficientFunds { .. }));
    }

    #[test]
    fn closing_sell_removes_the_position_and_banks_realized_pnl() {
        let account = account(dec!(4998.50), Decimal::ZERO);
        let existing = position(100, dec!(50.00), dec!(5001.50));
        let order = order(OrderSide::Sell, 100, Decimal::ZERO);

        let effect = sell_fill(
            &account,
            Some(&existing),
            &order,
            dec!(55.00),
            FEE_RATE,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(effect.executed_value, dec!(5500.00));
        assert_eq!(effect.fee, dec!(1.65));
        assert_eq!(effect.account.balance, dec!(4998.50) + dec!(5498.35));
        assert_eq!(effect.account.total_profit_loss, dec!(498.35));
        assert_eq!(effect.position, PositionChange::Remove(existing.id));
    }

    #[test]
    fn partial_sell_keeps_the_average_and_accrues_realized_pnl() {
        let account = account(dec!(1000.00), Decimal::ZERO);
        let existing = position(100, dec!(50.00), dec!(5001.50));
        let order = order(OrderSide::Sell, 40, Decimal::ZERO);

        let effect = sell_fill(
            &account,
            Some(&existing),
            &order,
            dec!(55.00),
            FEE_RATE,
            Utc::now(),
        )
        .unwrap();

        // 2200.00 executed, 0.66 fee, realized (55-50)*40 - 0.66 = 199.34.
        match effect.position {
            PositionChange::Upsert(p) => {
                assert_eq!(p.quantity, 60);
                assert_eq!(p.average_price, dec!(50.00));
                assert_eq!(p.total_cost, dec!(3000.00));
                assert_eq!(p.realized_pnl, dec!(199.34));
            }
            PositionChange::Remove(_) => panic!("expected an upsert"),
        }
        // The account total only moves when the position fully closes.
        assert_eq!(effect.account.total_profit_loss, Decimal::ZERO);
    }

    #[test]
    fn selling_more_than_held_is_refused() {
        let account = account(dec!(1000.00), Decimal::ZERO);
        let existing = position(10, dec!(50.00), dec!(500.00));
        let order = order(OrderSide::Sell, 11, Decimal::ZERO);

        let err = sell_fill(
            &account,
            Some(&existing),
            &order,
            dec!(55.00),
            FEE_RATE,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            BrokerageError::InsufficientShares {
                held: 10,
                requested: 11,
                ..
            }
        ));

        let err = sell_fill(&account, None, &order, dec!(55.00), FEE_RATE, Utc::now()).unwrap_err();
        assert!(matches!(err, BrokerageError::InsufficientShares { held: 0, .. }));
    }
}
