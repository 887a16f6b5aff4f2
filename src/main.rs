use std::sync::Arc;

use anyhow::Context;
use brokerage::{ExecutionSimulator, OrderAdmission, OrderLifecycle, OrderQueries};
use clap::{Parser, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use configuration::{Trading, load_config};
use core_types::{Order, OrderRequest, OrderSide, OrderStatus, TimeInForce};
use database::{
    LedgerStore, MemoryLedgerStore, OrderFilter, PgLedgerStore, connect, run_migrations,
};
use market_data::{BrapiClient, QuoteGateway, StaticQuotes};
use portfolio::{PortfolioAggregator, PositionView};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use uuid::Uuid;

/// The main entry point for the Boleta paper-trading ledger.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from a .env file, if one exists.
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    match cli.command {
        Commands::Demo => run_demo().await,
        Commands::OpenAccount(args) => handle_open_account(&Services::connect().await?, args).await,
        Commands::Buy(args) => handle_trade(&Services::connect().await?, OrderSide::Buy, args).await,
        Commands::Sell(args) => {
            handle_trade(&Services::connect().await?, OrderSide::Sell, args).await
        }
        Commands::Execute(args) => handle_execute(&Services::connect().await?, args).await,
        Commands::Cancel(args) => handle_cancel(&Services::connect().await?, args).await,
        Commands::Orders(args) => handle_orders(&Services::connect().await?, args).await,
        Commands::Positions(args) => handle_positions(&Services::connect().await?, args).await,
        Commands::Summary(args) => handle_summary(&Services::connect().await?, args).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// A paper-trading ledger and order-execution core for B3 equities.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted paper-trading session against the in-memory ledger.
    Demo,
    /// Open a new trading account with an opening cash balance.
    OpenAccount(OpenAccountArgs),
    /// Admit a buy order for an account.
    Buy(TradeArgs),
    /// Admit a sell order for an account.
    Sell(TradeArgs),
    /// Fill an admitted order at the current quote.
    Execute(ExecuteArgs),
    /// Cancel a resting order and release its reservation.
    Cancel(CancelArgs),
    /// List an account's orders, newest first.
    Orders(OrdersArgs),
    /// Show an account's positions marked to market.
    Positions(AccountArgs),
    /// Show an account's portfolio summary, allocation and diversification.
    Summary(AccountArgs),
}

#[derive(Parser)]
struct OpenAccountArgs {
    /// Opening cash balance.
    #[arg(long, default_value = "10000.00")]
    balance: Decimal,
}

#[derive(Parser)]
struct TradeArgs {
    /// The account placing the order.
    #[arg(long)]
    account: Uuid,

    /// The symbol to trade (e.g., "PETR4").
    #[arg(long)]
    symbol: String,

    /// Number of whole shares.
    #[arg(long)]
    quantity: i64,

    /// Admit a limit order at this price instead of a market order.
    #[arg(long)]
    limit_price: Option<Decimal>,
}

#[derive(Parser)]
struct ExecuteArgs {
    /// The order to fill.
    #[arg(long)]
    order: Uuid,
}

#[derive(Parser)]
struct CancelArgs {
    /// The order to cancel.
    #[arg(long)]
    order: Uuid,

    /// The account that owns the order.
    #[arg(long)]
    account: Uuid,
}

#[derive(Parser)]
struct OrdersArgs {
    /// The account whose orders to list.
    #[arg(long)]
    account: Uuid,

    /// Filter by status (e.g., "pending", "filled", "cancelled").
    #[arg(long)]
    status: Option<OrderStatus>,

    /// Filter by symbol.
    #[arg(long)]
    symbol: Option<String>,

    /// Maximum number of orders to return.
    #[arg(long)]
    limit: Option<i64>,
}

#[derive(Parser)]
struct AccountArgs {
    /// The account to inspect.
    #[arg(long)]
    account: Uuid,
}

// ==============================================================================
// Service Wiring
// ==============================================================================

/// The five core services plus the store handle, assembled over whichever
/// store and quote gateway the command runs against.
struct Services {
    store: Arc<dyn LedgerStore>,
    admission: OrderAdmission,
    lifecycle: OrderLifecycle,
    execution: ExecutionSimulator,
    queries: OrderQueries,
    aggregator: PortfolioAggregator,
}

impl Services {
    /// Wires the services to PostgreSQL and the live quote provider.
    async fn connect() -> anyhow::Result<Self> {
        let config = load_config().context("failed to load configuration")?;
        let pool = connect().await?;
        run_migrations(&pool).await?;

        let store: Arc<dyn LedgerStore> = Arc::new(PgLedgerStore::new(pool));
        let quotes: Arc<dyn QuoteGateway> = Arc::new(BrapiClient::new(&config.market_data)?);
        Ok(Self::assemble(store, quotes, &config.trading))
    }

    fn assemble(
        store: Arc<dyn LedgerStore>,
        quotes: Arc<dyn QuoteGateway>,
        trading: &Trading,
    ) -> Self {
        Self {
            admission: OrderAdmission::new(store.clone(), quotes.clone()),
            lifecycle: OrderLifecycle::new(store.clone()),
            execution: ExecutionSimulator::new(store.clone(), quotes.clone(), trading),
            queries: OrderQueries::new(store.clone()),
            aggregator: PortfolioAggregator::new(store.clone(), quotes),
            store,
        }
    }
}

// ==============================================================================
// Command Handlers
// ==============================================================================

async fn handle_open_account(services: &Services, args: OpenAccountArgs) -> anyhow::Result<()> {
    let user_id = Uuid::new_v4();
    let number = format!("BR-{}", &user_id.simple().to_string()[..8]);
    let account = services
        .store
        .create_account(user_id, &number, args.balance)
        .await?;
    println!(
        "Opened account {} ({}) with balance {}",
        account.id, account.account_number, account.balance
    );
    Ok(())
}

async fn handle_trade(
    services: &Services,
    side: OrderSide,
    args: TradeArgs,
) -> anyhow::Result<()> {
    let request = match args.limit_price {
        Some(limit_price) => OrderRequest::Limit {
            symbol: args.symbol,
            side,
            quantity: args.quantity,
            limit_price,
            time_in_force: TimeInForce::Day,
        },
        None => OrderRequest::Market {
            symbol: args.symbol,
            side,
            quantity: args.quantity,
            time_in_force: TimeInForce::Day,
        },
    };

    let order = services.admission.place_order(args.account, &request).await?;
    println!(
        "Admitted {} {} order {}: {} x{} (reserved {})",
        order.side, order.order_type, order.id, order.symbol, order.quantity, order.reserved_amount
    );
    Ok(())
}

async fn handle_execute(services: &Services, args: ExecuteArgs) -> anyhow::Result<()> {
    let order = services.execution.execute_order(args.order).await?;
    println!(
        "Filled order {}: {} x{} for {} (fees {})",
        order.id, order.symbol, order.filled_quantity, order.total_executed_value, order.fees
    );
    Ok(())
}

async fn handle_cancel(services: &Services, args: CancelArgs) -> anyhow::Result<()> {
    let order = services.lifecycle.cancel_order(args.order, args.account).await?;
    println!(
        "Cancelled order {}: released {}",
        order.id, order.reserved_amount
    );
    Ok(())
}

async fn handle_orders(services: &Services, args: OrdersArgs) -> anyhow::Result<()> {
    let filter = OrderFilter {
        status: args.status,
        symbol: args.symbol.map(|s| s.trim().to_uppercase()),
        limit: args.limit,
    };
    let orders = services.queries.orders(args.account, &filter).await?;
    if orders.is_empty() {
        println!("No orders found.");
        return Ok(());
    }
    println!("{}", order_table(&orders));
    Ok(())
}

async fn handle_positions(services: &Services, args: AccountArgs) -> anyhow::Result<()> {
    let views = services.aggregator.positions(args.account).await?;
    if views.is_empty() {
        println!("No open positions.");
        return Ok(());
    }
    println!("{}", positions_table(&views));
    Ok(())
}

async fn handle_summary(services: &Services, args: AccountArgs) -> anyhow::Result<()> {
    let summary = services.aggregator.summary(args.account).await?;
    let diversification = services.aggregator.diversification(args.account).await?;
    let allocation = services.aggregator.allocation(args.account).await?;

    println!(
        "Account {} ({})",
        summary.account.id, summary.account.account_number
    );
    println!(
        "  cash {}  blocked {}  available {}",
        summary.account.balance,
        summary.account.blocked_balance,
        summary.account.available_balance()
    );
    if !summary.positions.is_empty() {
        println!("{}", positions_table(&summary.positions));
    }
    println!(
        "Total value {}  invested {}  P&L {} ({}%)  day change {} ({}%)",
        summary.total_value,
        summary.total_invested,
        summary.total_profit_loss,
        summary.total_profit_loss_percent,
        summary.day_change,
        summary.day_change_percent
    );
    println!(
        "Diversification score {} (HHI {}, {} positions)",
        diversification.diversification_score,
        diversification.concentration,
        diversification.position_count
    );
    if !summary.missing_quotes.is_empty() {
        println!("Quotes missing for: {}", summary.missing_quotes.join(", "));
    }
    println!("Allocation: {}", serde_json::to_string_pretty(&allocation)?);
    Ok(())
}

// ==============================================================================
// Demo Session
// ==============================================================================

/// A scripted session against the in-memory store and pinned quotes, walking
/// one account through admissions, a cancellation, fills and the portfolio
/// views.
async fn run_demo() -> anyhow::Result<()> {
    let config = load_config().context("failed to load configuration")?;

    let memory_store = Arc::new(MemoryLedgerStore::new());
    let static_quotes = Arc::new(StaticQuotes::new());
    static_quotes.set_price("PETR4", dec!(38.52)).await;
    static_quotes.set_price("VALE3", dec!(61.20)).await;
    static_quotes.set_price("ITUB4", dec!(27.35)).await;

    let store: Arc<dyn LedgerStore> = memory_store.clone();
    let quotes: Arc<dyn QuoteGateway> = static_quotes.clone();
    let services = Services::assemble(store, quotes, &config.trading);

    let account = services
        .store
        .create_account(Uuid::new_v4(), "BR-DEMO-001", dec!(10000.00))
        .await?;
    println!(
        "Opened demo account {} with balance {}",
        account.account_number, account.balance
    );

    // Buy into two symbols at market.
    let buy_petr = services
        .admission
        .place_order(
            account.id,
            &OrderRequest::Market {
                symbol: "PETR4".to_string(),
                side: OrderSide::Buy,
                quantity: 100,
                time_in_force: TimeInForce::Day,
            },
        )
        .await?;
    println!(
        "Admitted buy of 100 PETR4, reserving {}",
        buy_petr.reserved_amount
    );
    services.execution.execute_order(buy_petr.id).await?;

    let buy_vale = services
        .admission
        .place_order(
            account.id,
            &OrderRequest::Market {
                symbol: "VALE3".to_string(),
                side: OrderSide::Buy,
                quantity: 50,
                time_in_force: TimeInForce::Day,
            },
        )
        .await?;
    services.execution.execute_order(buy_vale.id).await?;

    // Admit a limit order, then change our mind.
    let buy_itub = services
        .admission
        .place_order(
            account.id,
            &OrderRequest::Limit {
                symbol: "ITUB4".to_string(),
                side: OrderSide::Buy,
                quantity: 40,
                limit_price: dec!(27.00),
                time_in_force: TimeInForce::Gtc,
            },
        )
        .await?;
    services.lifecycle.cancel_order(buy_itub.id, account.id).await?;
    println!("Cancelled the resting ITUB4 limit order, reservation released");

    // The market moves, and we take some profit on PETR4.
    static_quotes.set_price("PETR4", dec!(41.00)).await;
    static_quotes.set_price("VALE3", dec!(60.10)).await;
    let sell_petr = services
        .admission
        .place_order(
            account.id,
            &OrderRequest::Market {
                symbol: "PETR4".to_string(),
                side: OrderSide::Sell,
                quantity: 60,
                time_in_force: TimeInForce::Day,
            },
        )
        .await?;
    let sold = services.execution.execute_order(sell_petr.id).await?;
    println!(
        "Sold 60 PETR4 for {} (fees {})",
        sold.total_executed_value, sold.fees
    );

    let orders = services
        .queries
        .orders(account.id, &OrderFilter::default())
        .await?;
    println!("\nOrders:\n{}", order_table(&orders));

    let summary = services.aggregator.summary(account.id).await?;
    let diversification = services.aggregator.diversification(account.id).await?;
    println!("\nPositions:\n{}", positions_table(&summary.positions));
    println!(
        "Total value {}  invested {}  unrealized P&L {} ({}%)",
        summary.total_value,
        summary.total_invested,
        summary.total_profit_loss,
        summary.total_profit_loss_percent
    );
    println!(
        "Cash {}  realized P&L (closed positions) {}",
        summary.account.balance, summary.account.total_profit_loss
    );
    println!(
        "Diversification score {} (HHI {})",
        diversification.diversification_score, diversification.concentration
    );
    Ok(())
}

// ==============================================================================
// Table Rendering
// ==============================================================================

fn order_table(orders: &[Order]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "Id", "Symbol", "Side", "Type", "Qty", "Status", "Executed", "Fees", "Created",
        ]);
    for order in orders {
        table.add_row(vec![
            order.id.to_string(),
            order.symbol.clone(),
            order.side.to_string(),
            order.order_type.to_string(),
            order.quantity.to_string(),
            order.status.to_string(),
            order.total_executed_value.to_string(),
            order.fees.to_string(),
            order.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }
    table
}

fn positions_table(views: &[PositionView]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "Symbol", "Qty", "Avg Price", "Cost", "Price", "Value", "Unrealized", "Unrl %",
            "Alloc %",
        ]);
    for view in views {
        table.add_row(vec![
            view.symbol.clone(),
            view.quantity.to_string(),
            view.average_price.to_string(),
            view.total_cost.to_string(),
            money_or_dash(view.current_price),
            money_or_dash(view.total_value),
            money_or_dash(view.unrealized_pnl),
            money_or_dash(view.unrealized_pnl_percent),
            money_or_dash(view.allocation),
        ]);
    }
    table
}

fn money_or_dash(value: Option<Decimal>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
