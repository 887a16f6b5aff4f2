//! Read-only view structs produced by the aggregator. The request layer
//! above this core serializes them as JSON.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use core_types::{Account, CoreError, Position, Quote, round_money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One position marked to the latest quote.
///
/// The price-dependent fields are absent when no quote could be resolved
/// for the symbol; the holding itself is still reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionView {
    pub id: Uuid,
    pub account_id: Uuid,
    pub symbol: String,
    pub quantity: i64,
    pub average_price: Decimal,
    pub total_cost: Decimal,
    pub realized_pnl: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_value: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unrealized_pnl: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unrealized_pnl_percent: Option<Decimal>,
    /// Share of total portfolio value, in percentage points. Only set in
    /// summary context, where the total is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocation: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PositionView {
    pub fn new(position: &Position, quote: Option<&Quote>) -> Self {
        let mut view = Self {
            id: position.id,
            account_id: position.account_id,
            symbol: position.symbol.clone(),
            quantity: position.quantity,
            average_price: position.average_price,
            total_cost: position.total_cost,
            realized_pnl: position.realized_pnl,
            current_price: None,
            total_value: None,
            unrealized_pnl: None,
            unrealized_pnl_percent: None,
            allocation: None,
            created_at: position.created_at,
            updated_at: position.updated_at,
        };
        if let Some(quote) = quote {
            view.current_price = Some(quote.price);
            view.total_value = Some(round_money(position.market_value(quote.price)));
            view.unrealized_pnl = Some(round_money(position.unrealized_pnl(quote.price)));
            view.unrealized_pnl_percent =
                Some(round_money(position.unrealized_pnl_percent(quote.price)));
        }
        view
    }
}

/// Point-in-time valuation of a whole account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub account: Account,
    /// Positions that could be marked to market. Holdings whose quote is
    /// missing are listed in `missing_quotes` instead.
    pub positions: Vec<PositionView>,
    pub total_value: Decimal,
    pub total_invested: Decimal,
    pub total_profit_loss: Decimal,
    pub total_profit_loss_percent: Decimal,
    pub day_change: Decimal,
    pub day_change_percent: Decimal,
    pub position_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_quotes: Vec<String>,
}

impl PortfolioSummary {
    /// The view of an account holding nothing but cash.
    pub fn cash_only(account: Account) -> Self {
        let total_value = account.balance;
        Self {
            account,
            positions: Vec::new(),
            total_value,
            total_invested: Decimal::ZERO,
            total_profit_loss: Decimal::ZERO,
            total_profit_loss_percent: Decimal::ZERO,
            day_change: Decimal::ZERO,
            day_change_percent: Decimal::ZERO,
            position_count: 0,
            missing_quotes: Vec::new(),
        }
    }
}

/// How the account's value splits between free cash and stock holdings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allocation {
    pub cash: AllocationSlice,
    pub stocks: StockAllocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationSlice {
    pub value: Decimal,
    pub percent: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockAllocation {
    pub value: Decimal,
    pub percent: Decimal,
    pub positions: Vec<SymbolAllocation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolAllocation {
    pub symbol: String,
    pub value: Decimal,
    pub percent: Decimal,
}

/// Concentration metrics over the marked positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diversification {
    pub position_count: usize,
    /// 0 to 100, higher is more diversified.
    pub diversification_score: u32,
    /// The raw Herfindahl-Hirschman index, rounded to the nearest point.
    pub concentration: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub largest_position: Option<LargestPosition>,
}

impl Diversification {
    pub fn empty() -> Self {
        Self {
            position_count: 0,
            diversification_score: 0,
            concentration: 0,
            largest_position: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LargestPosition {
    pub symbol: String,
    pub allocation: Decimal,
}

/// Summary-derived return figures for one reporting period.
///
/// The historical series stays empty until an out-of-band snapshot job
/// records equity points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Performance {
    pub period: Period,
    pub total_return: Decimal,
    pub total_return_percent: Decimal,
    pub day_change: Decimal,
    pub day_change_percent: Decimal,
    pub history: Vec<EquityPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub value: Decimal,
}

/// A reporting window for the performance view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1w")]
    OneWeek,
    #[default]
    #[serde(rename = "1m")]
    OneMonth,
    #[serde(rename = "3m")]
    ThreeMonths,
    #[serde(rename = "6m")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "ytd")]
    YearToDate,
    #[serde(rename = "all")]
    All,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneDay => "1d",
            Period::OneWeek => "1w",
            Period::OneMonth => "1m",
            Period::ThreeMonths => "3m",
            Period::SixMonths => "6m",
            Period::OneYear => "1y",
            Period::YearToDate => "ytd",
            Period::All => "all",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1d" => Ok(Period::OneDay),
            "1w" => Ok(Period::OneWeek),
            "1m" => Ok(Period::OneMonth),
            "3m" => Ok(Period::ThreeMonths),
            "6m" => Ok(Period::SixMonths),
            "1y" => Ok(Period::OneYear),
            "ytd" => Ok(Period::YearToDate),
            "all" => Ok(Period::All),
            other => Err(CoreError::InvalidInput(
                "period".to_string(),
                other.to_string(),
            )),
        }
    }
}
