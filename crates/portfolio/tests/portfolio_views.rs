//! Aggregation views computed over seeded ledger state and pinned quotes.

use std::sync::Arc;

use chrono::Utc;
use core_types::{Position, Quote};
use database::{LedgerStore, MemoryLedgerStore};
use market_data::{QuoteGateway, StaticQuotes};
use portfolio::{Period, PortfolioAggregator, PortfolioError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

struct Harness {
    store: Arc<MemoryLedgerStore>,
    quotes: Arc<StaticQuotes>,
    aggregator: PortfolioAggregator,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(MemoryLedgerStore::new());
        let quotes = Arc::new(StaticQuotes::new());
        let store_dyn: Arc<dyn LedgerStore> = store.clone();
        let quotes_dyn: Arc<dyn QuoteGateway> = quotes.clone();
        Self {
            aggregator: PortfolioAggregator::new(store_dyn, quotes_dyn),
            store,
            quotes,
        }
    }

    async fn open_account(&self, balance: Decimal) -> Uuid {
        self.store
            .create_account(Uuid::new_v4(), "BR-7001", balance)
            .await
            .unwrap()
            .id
    }

    async fn seed_position(
        &self,
        account_id: Uuid,
        symbol: &str,
        quantity: i64,
        average_price: Decimal,
        total_cost: Decimal,
    ) {
        let now = Utc::now();
        let position = Position {
            id: Uuid::new_v4(),
            account_id,
            symbol: symbol.to_string(),
            quantity,
            average_price,
            total_cost,
            realized_pnl: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        };
        let mut tx = self.store.begin().await.unwrap();
        tx.upsert_position(&position).await.unwrap();
        tx.commit().await.unwrap();
    }

    async fn quote(&self, symbol: &str, price: Decimal, previous_close: Decimal) {
        self.quotes
            .insert(Quote {
                symbol: symbol.to_string(),
                price,
                previous_close: Some(previous_close),
                day_high: None,
                day_low: None,
                volume: None,
                updated_at: Utc::now(),
            })
            .await;
    }
}

#[tokio::test]
async fn the_summary_marks_every_position_to_market() {
    let h = Harness::new();
    let account_id = h.open_account(dec!(3000.00)).await;
    h.seed_position(account_id, "PETR4", 100, dec!(50.00), dec!(5001.50))
        .await;
    h.seed_position(account_id, "VALE3", 50, dec!(60.00), dec!(3000.00))
        .await;
    h.quote("PETR4", dec!(55.00), dec!(54.00)).await;
    h.quote("VALE3", dec!(58.00), dec!(60.00)).await;

    let summary = h.aggregator.summary(account_id).await.unwrap();

    assert_eq!(summary.total_value, dec!(11400.00));
    assert_eq!(summary.total_invested, dec!(8001.50));
    assert_eq!(summary.total_profit_loss, dec!(400.00));
    assert_eq!(summary.total_profit_loss_percent, dec!(5.00));
    // PETR4 gained 1.00 on 100 shares, VALE3 lost 2.00 on 50: a wash.
    assert_eq!(summary.day_change, Decimal::ZERO);
    assert_eq!(summary.day_change_percent, Decimal::ZERO);
    assert_eq!(summary.position_count, 2);
    assert!(summary.missing_quotes.is_empty());

    let petr = &summary.positions[0];
    assert_eq!(petr.symbol, "PETR4");
    assert_eq!(petr.total_value, Some(dec!(5500.00)));
    assert_eq!(petr.unrealized_pnl, Some(dec!(500.00)));
    assert_eq!(petr.allocation, Some(dec!(48.25)));

    let vale = &summary.positions[1];
    assert_eq!(vale.symbol, "VALE3");
    assert_eq!(vale.total_value, Some(dec!(2900.00)));
    assert_eq!(vale.unrealized_pnl, Some(dec!(-100.00)));
    assert_eq!(vale.allocation, Some(dec!(25.44)));
}

#[tokio::test]
async fn a_cash_only_account_summarizes_without_failing() {
    let h = Harness::new();
    let account_id = h.open_account(dec!(5000.00)).await;

    let summary = h.aggregator.summary(account_id).await.unwrap();
    assert_eq!(summary.total_value, dec!(5000.00));
    assert_eq!(summary.total_invested, Decimal::ZERO);
    assert_eq!(summary.total_profit_loss, Decimal::ZERO);
    assert_eq!(summary.day_change, Decimal::ZERO);
    assert!(summary.positions.is_empty());
    assert_eq!(summary.position_count, 0);

    let diversification = h.aggregator.diversification(account_id).await.unwrap();
    assert_eq!(diversification.diversification_score, 0);
    assert!(diversification.largest_position.is_none());
}

#[tokio::test]
async fn a_missing_quote_is_skipped_but_surfaced() {
    let h = Harness::new();
    let account_id = h.open_account(dec!(1000.00)).await;
    h.seed_position(account_id, "PETR4", 100, dec!(50.00), dec!(5001.50))
        .await;
    h.seed_position(account_id, "VALE3", 50, dec!(60.00), dec!(3000.00))
        .await;
    h.quote("PETR4", dec!(55.00), dec!(54.00)).await;

    let summary = h.aggregator.summary(account_id).await.unwrap();
    assert_eq!(summary.position_count, 1);
    assert_eq!(summary.positions[0].symbol, "PETR4");
    assert_eq!(summary.missing_quotes, vec!["VALE3".to_string()]);
    // Only the marked position contributes to the totals.
    assert_eq!(summary.total_value, dec!(6500.00));
    assert_eq!(summary.total_invested, dec!(5001.50));

    // The plain position listing still reports the unmarked holding.
    let views = h.aggregator.positions(account_id).await.unwrap();
    assert_eq!(views.len(), 2);
    let vale = views.iter().find(|v| v.symbol == "VALE3").unwrap();
    assert!(vale.current_price.is_none());
    assert!(vale.total_value.is_none());
    assert_eq!(vale.quantity, 50);
}

#[tokio::test]
async fn allocation_splits_cash_and_stocks_by_value() {
    let h = Harness::new();
    let account_id = h.open_account(dec!(2500.00)).await;
    h.seed_position(account_id, "PETR4", 100, dec!(70.00), dec!(7000.00))
        .await;
    h.quote("PETR4", dec!(75.00), dec!(74.00)).await;

    let allocation = h.aggregator.allocation(account_id).await.unwrap();
    assert_eq!(allocation.cash.value, dec!(2500.00));
    assert_eq!(allocation.cash.percent, dec!(25.00));
    assert_eq!(allocation.stocks.value, dec!(7500.00));
    assert_eq!(allocation.stocks.percent, dec!(75.00));
    assert_eq!(allocation.stocks.positions.len(), 1);
    assert_eq!(allocation.stocks.positions[0].symbol, "PETR4");
    assert_eq!(allocation.stocks.positions[0].value, dec!(7500.00));
    assert_eq!(allocation.stocks.positions[0].percent, dec!(75.00));
}

#[tokio::test]
async fn diversification_reflects_the_book_concentration() {
    let h = Harness::new();
    let account_id = h.open_account(Decimal::ZERO).await;
    h.seed_position(account_id, "PETR4", 100, dec!(70.00), dec!(7000.00))
        .await;
    h.seed_position(account_id, "VALE3", 50, dec!(60.00), dec!(3000.00))
        .await;
    h.quote("PETR4", dec!(70.00), dec!(70.00)).await;
    h.quote("VALE3", dec!(60.00), dec!(60.00)).await;

    let diversification = h.aggregator.diversification(account_id).await.unwrap();
    assert_eq!(diversification.position_count, 2);
    assert_eq!(diversification.concentration, 5800);
    assert_eq!(diversification.diversification_score, 42);
    let largest = diversification.largest_position.unwrap();
    assert_eq!(largest.symbol, "PETR4");
    assert_eq!(largest.allocation, dec!(70.00));
}

#[tokio::test]
async fn performance_mirrors_the_summary_for_the_requested_period() {
    let h = Harness::new();
    let account_id = h.open_account(dec!(3000.00)).await;
    h.seed_position(account_id, "PETR4", 100, dec!(50.00), dec!(5001.50))
        .await;
    h.quote("PETR4", dec!(55.00), dec!(54.00)).await;

    let period: Period = "1y".parse().unwrap();
    let performance = h.aggregator.performance(account_id, period).await.unwrap();
    assert_eq!(performance.period, Period::OneYear);
    assert_eq!(performance.total_return, dec!(500.00));
    assert_eq!(performance.day_change, dec!(100.00));
    assert!(performance.history.is_empty());

    let json = serde_json::to_value(&performance).unwrap();
    assert_eq!(json["period"], "1y");
}

#[tokio::test]
async fn an_unknown_account_reports_not_found() {
    let h = Harness::new();
    let err = h.aggregator.summary(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, PortfolioError::AccountNotFound(_)));
}
