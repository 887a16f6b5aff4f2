use std::collections::HashMap;
use std::sync::Arc;

use core_types::{Position, Quote, round_money};
use database::LedgerStore;
use market_data::QuoteGateway;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use crate::error::PortfolioError;
use crate::views::{
    Allocation, AllocationSlice, Diversification, LargestPosition, Performance, Period,
    PortfolioSummary, PositionView, StockAllocation, SymbolAllocation,
};

/// Combines account state, positions and live quotes into valuation views.
///
/// Every method is a pure read. The views tolerate a position set and quote
/// snapshot that are momentarily out of sync; a symbol without a quote is
/// skipped from the totals and reported in `missing_quotes` rather than
/// failing the whole view.
pub struct PortfolioAggregator {
    store: Arc<dyn LedgerStore>,
    quotes: Arc<dyn QuoteGateway>,
}

impl PortfolioAggregator {
    pub fn new(store: Arc<dyn LedgerStore>, quotes: Arc<dyn QuoteGateway>) -> Self {
        Self { store, quotes }
    }

    /// All holdings of the account, marked to the latest quotes. Holdings
    /// whose symbol has no quote keep their ledger fields but carry no
    /// market figures.
    pub async fn positions(&self, account_id: Uuid) -> Result<Vec<PositionView>, PortfolioError> {
        let positions = self.store.positions(account_id).await?;
        if positions.is_empty() {
            return Ok(Vec::new());
        }
        let quote_map = self.quote_map(&positions).await?;
        Ok(positions
            .iter()
            .map(|position| PositionView::new(position, quote_map.get(position.symbol.as_str())))
            .collect())
    }

    /// The account's total valuation: cash plus every marked position, with
    /// invested capital, unrealized P&L and day-change figures.
    pub async fn summary(&self, account_id: Uuid) -> Result<PortfolioSummary, PortfolioError> {
        let account = self.store.account(account_id).await?;
        let positions = self.store.positions(account_id).await?;
        if positions.is_empty() {
            return Ok(PortfolioSummary::cash_only(account));
        }

        let quote_map = self.quote_map(&positions).await?;

        let mut total_value = account.balance;
        let mut total_invested = Decimal::ZERO;
        let mut total_profit_loss = Decimal::ZERO;
        let mut day_change = Decimal::ZERO;
        let mut views = Vec::with_capacity(positions.len());
        let mut missing_quotes = Vec::new();

        for position in &positions {
            let Some(quote) = quote_map.get(position.symbol.as_str()) else {
                tracing::warn!(
                    symbol = %position.symbol,
                    "no quote for held symbol, leaving it out of the totals"
                );
                missing_quotes.push(position.symbol.clone());
                continue;
            };
            let view = PositionView::new(position, Some(quote));
            total_value += view.total_value.unwrap_or_default();
            total_invested += position.total_cost;
            total_profit_loss += view.unrealized_pnl.unwrap_or_default();
            if let Some(previous_close) = quote.previous_close {
                day_change += (quote.price - previous_close) * Decimal::from(position.quantity);
            }
            views.push(view);
        }

        for view in &mut views {
            view.allocation = Some(percent_of(view.total_value.unwrap_or_default(), total_value));
        }
        let day_change = round_money(day_change);
        let position_count = views.len();

        Ok(PortfolioSummary {
            account,
            positions: views,
            total_value,
            total_invested,
            total_profit_loss,
            total_profit_loss_percent: percent_of(total_profit_loss, total_invested),
            day_change,
            day_change_percent: percent_of(day_change, total_value),
            position_count,
            missing_quotes,
        })
    }

    /// Splits the account's value between free cash and stock holdings,
    /// with a per-symbol breakdown.
    pub async fn allocation(&self, account_id: Uuid) -> Result<Allocation, PortfolioError> {
        let summary = self.summary(account_id).await?;

        let cash_value = summary.account.balance;
        let mut stock_value = Decimal::ZERO;
        let mut breakdown = Vec::with_capacity(summary.positions.len());
        for view in &summary.positions {
            let value = view.total_value.unwrap_or_default();
            stock_value += value;
            breakdown.push(SymbolAllocation {
                symbol: view.symbol.clone(),
                value,
                percent: view.allocation.unwrap_or_default(),
            });
        }

        Ok(Allocation {
            cash: AllocationSlice {
                value: cash_value,
                percent: percent_of(cash_value, summary.total_value),
            },
            stocks: StockAllocation {
                value: stock_value,
                percent: percent_of(stock_value, summary.total_value),
                positions: breakdown,
            },
        })
    }

    /// Herfindahl-Hirschman concentration over the marked positions.
    pub async fn diversification(
        &self,
        account_id: Uuid,
    ) -> Result<Diversification, PortfolioError> {
        let summary = self.summary(account_id).await?;
        Ok(concentration_of(&summary.positions))
    }

    /// Summary-derived return figures tagged with the requested period.
    pub async fn performance(
        &self,
        account_id: Uuid,
        period: Period,
    ) -> Result<Performance, PortfolioError> {
        let summary = self.summary(account_id).await?;
        Ok(Performance {
            period,
            total_return: summary.total_profit_loss,
            total_return_percent: summary.total_profit_loss_percent,
            day_change: summary.day_change,
            day_change_percent: summary.day_change_percent,
            history: Vec::new(),
        })
    }

    /// One batch gateway call for all held symbols, keyed by symbol.
    async fn quote_map(
        &self,
        positions: &[Position],
    ) -> Result<HashMap<String, Quote>, PortfolioError> {
        let symbols: Vec<String> = positions.iter().map(|p| p.symbol.clone()).collect();
        let quotes = self.quotes.quotes(&symbols).await?;
        Ok(quotes
            .into_iter()
            .map(|quote| (quote.symbol.clone(), quote))
            .collect())
    }
}

fn percent_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    round_money(part / whole * Decimal::ONE_HUNDRED)
}

/// HHI over allocations in percentage points; `score = max(0, 100 - HHI/100)`.
/// A single all-in position scores 0, an evenly spread book approaches 100.
fn concentration_of(views: &[PositionView]) -> Diversification {
    if views.is_empty() {
        return Diversification::empty();
    }

    let mut hhi = Decimal::ZERO;
    let mut largest: Option<LargestPosition> = None;
    for view in views {
        let allocation = view.allocation.unwrap_or_default();
        hhi += allocation * allocation;
        if largest.as_ref().is_none_or(|l| allocation > l.allocation) {
            largest = Some(LargestPosition {
                symbol: view.symbol.clone(),
                allocation,
            });
        }
    }

    let score = (Decimal::ONE_HUNDRED - hhi / Decimal::ONE_HUNDRED).max(Decimal::ZERO);
    Diversification {
        position_count: views.len(),
        diversification_score: round_to_points(score),
        concentration: round_to_points(hhi),
        largest_position: largest,
    }
}

fn round_to_points(value: Decimal) -> u32 {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u32()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn view_with_allocation(symbol: &str, allocation: Decimal) -> PositionView {
        let now = Utc::now();
        PositionView {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            quantity: 100,
            average_price: dec!(10.00),
            total_cost: dec!(1000.00),
            realized_pnl: Decimal::ZERO,
            current_price: Some(dec!(10.00)),
            total_value: Some(dec!(1000.00)),
            unrealized_pnl: Some(Decimal::ZERO),
            unrealized_pnl_percent: Some(Decimal::ZERO),
            allocation: Some(allocation),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn a_seventy_thirty_split_scores_forty_two() {
        let views = vec![
            view_with_allocation("PETR4", dec!(70)),
            view_with_allocation("VALE3", dec!(30)),
        ];

        let diversification = concentration_of(&views);
        assert_eq!(diversification.position_count, 2);
        assert_eq!(diversification.concentration, 5800);
        assert_eq!(diversification.diversification_score, 42);
        let largest = diversification.largest_position.unwrap();
        assert_eq!(largest.symbol, "PETR4");
        assert_eq!(largest.allocation, dec!(70));
    }

    #[test]
    fn an_all_in_position_scores_zero() {
        let views = vec![view_with_allocation("PETR4", dec!(100))];
        let diversification = concentration_of(&views);
        assert_eq!(diversification.concentration, 10000);
        assert_eq!(diversification.diversification_score, 0);
    }

    #[test]
    fn an_empty_book_scores_zero_with_no_largest_position() {
        let diversification = concentration_of(&[]);
        assert_eq!(diversification.position_count, 0);
        assert_eq!(diversification.diversification_score, 0);
        assert_eq!(diversification.concentration, 0);
        assert!(diversification.largest_position.is_none());
    }

    #[test]
    fn percentages_guard_against_zero_denominators() {
        assert_eq!(percent_of(dec!(50), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(percent_of(dec!(50), dec!(200)), dec!(25.00));
        assert_eq!(percent_of(dec!(-100), dec!(400)), dec!(-25.00));
    }
}
