use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::{AccountStatus, OrderSide, OrderStatus, OrderType, TimeInForce};

/// A paper-trading account. `balance` is the total cash on the books and
/// `blocked_balance` is the slice of it reserved by active buy orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub user_id: Uuid,
    pub account_number: String,
    pub balance: Decimal,
    pub blocked_balance: Decimal,
    pub total_invested: Decimal,
    pub total_profit_loss: Decimal,
    pub status: AccountStatus,
    /// Optional risk cap: the largest order value (quantity times reference
    /// price) this account may admit. `None` means uncapped.
    pub max_position_size: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Cash the account can still commit to new buy orders.
    pub fn available_balance(&self) -> Decimal {
        self.balance - self.blocked_balance
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

/// A single order on the books, from admission through its terminal state.
///
/// `reserved_amount` records exactly how much cash the admission step blocked
/// for this order (zero for sells), so that cancellation and execution can
/// release precisely what was taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub account_id: Uuid,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: i64,
    pub limit_price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub status: OrderStatus,
    pub filled_quantity: i64,
    pub total_executed_value: Decimal,
    pub fees: Decimal,
    pub reserved_amount: Decimal,
    pub time_in_force: TimeInForce,
    pub executed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn remaining_quantity(&self) -> i64 {
        self.quantity - self.filled_quantity
    }

    /// Average price across everything filled so far, `None` before any fill.
    pub fn average_fill_price(&self) -> Option<Decimal> {
        if self.filled_quantity <= 0 {
            return None;
        }
        Some(self.total_executed_value / Decimal::from(self.filled_quantity))
    }
}

/// The account's holding in a single symbol. At most one row exists per
/// `(account_id, symbol)` pair, and a row with zero quantity is deleted
/// rather than kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: Uuid,
    pub account_id: Uuid,
    pub symbol: String,
    pub quantity: i64,
    pub average_price: Decimal,
    pub total_cost: Decimal,
    pub realized_pnl: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Position {
    pub fn market_value(&self, price: Decimal) -> Decimal {
        price * Decimal::from(self.quantity)
    }

    pub fn unrealized_pnl(&self, price: Decimal) -> Decimal {
        (price - self.average_price) * Decimal::from(self.quantity)
    }

    /// Unrealized P&L as a percentage of the pre-fee cost basis
    /// (`quantity * average_price`), zero when there is none.
    pub fn unrealized_pnl_percent(&self, price: Decimal) -> Decimal {
        let cost_basis = self.average_price * Decimal::from(self.quantity);
        if cost_basis <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        self.unrealized_pnl(price) / cost_basis * Decimal::from(100)
    }
}

/// A market snapshot for one symbol, as served by the quote gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: Decimal,
    pub previous_close: Option<Decimal>,
    pub day_high: Option<Decimal>,
    pub day_low: Option<Decimal>,
    pub volume: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

/// A validated intent to trade, before admission turns it into an [`Order`].
///
/// The variant fixes which prices must be present: a limit order always
/// carries its limit price, a stop order its trigger, and a stop-limit both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderRequest {
    Market {
        symbol: String,
        side: OrderSide,
        quantity: i64,
        #[serde(default)]
        time_in_force: TimeInForce,
    },
    Limit {
        symbol: String,
        side: OrderSide,
        quantity: i64,
        limit_price: Decimal,
        #[serde(default)]
        time_in_force: TimeInForce,
    },
    Stop {
        symbol: String,
        side: OrderSide,
        quantity: i64,
        stop_price: Decimal,
        #[serde(default)]
        time_in_force: TimeInForce,
    },
    StopLimit {
        symbol: String,
        side: OrderSide,
        quantity: i64,
        limit_price: Decimal,
        stop_price: Decimal,
        #[serde(default)]
        time_in_force: TimeInForce,
    },
}

impl OrderRequest {
    pub fn symbol(&self) -> &str {
        match self {
            OrderRequest::Market { symbol, .. }
            | OrderRequest::Limit { symbol, .. }
            | OrderRequest::Stop { symbol, .. }
            | OrderRequest::StopLimit { symbol, .. } => symbol,
        }
    }

    pub fn side(&self) -> OrderSide {
        match self {
            OrderRequest::Market { side, .. }
            | OrderRequest::Limit { side, .. }
            | OrderRequest::Stop { side, .. }
            | OrderRequest::StopLimit { side, .. } => *side,
        }
    }

    pub fn quantity(&self) -> i64 {
        match self {
            OrderRequest::Market { quantity, .. }
            | OrderRequest::Limit { quantity, .. }
            | OrderRequest::Stop { quantity, .. }
            | OrderRequest::StopLimit { quantity, .. } => *quantity,
        }
    }

    pub fn time_in_force(&self) -> TimeInForce {
        match self {
            OrderRequest::Market { time_in_force, .. }
            | OrderRequest::Limit { time_in_force, .. }
            | OrderRequest::Stop { time_in_force, .. }
            | OrderRequest::StopLimit { time_in_force, .. } => *time_in_force,
        }
    }

    pub fn order_type(&self) -> OrderType {
        match self {
            OrderRequest::Market { .. } => OrderType::Market,
            OrderRequest::Limit { .. } => OrderType::Limit,
            OrderRequest::Stop { .. } => OrderType::Stop,
            OrderRequest::StopLimit { .. } => OrderType::StopLimit,
        }
    }

    pub fn limit_price(&self) -> Option<Decimal> {
        match self {
            OrderRequest::Limit { limit_price, .. }
            | OrderRequest::StopLimit { limit_price, .. } => Some(*limit_price),
            OrderRequest::Market { .. } | OrderRequest::Stop { .. } => None,
        }
    }

    pub fn stop_price(&self) -> Option<Decimal> {
        match self {
            OrderRequest::Stop { stop_price, .. }
            | OrderRequest::StopLimit { stop_price, .. } => Some(*stop_price),
            OrderRequest::Market { .. } | OrderRequest::Limit { .. } => None,
        }
    }
}
