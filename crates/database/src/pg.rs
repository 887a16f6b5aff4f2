use async_trait::async_trait;
use chrono::Utc;
use core_types::{Account, AccountStatus, Order, Position, round_money};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::{LedgerStore, LedgerTx, OrderFilter};

/// The PostgreSQL-backed ledger store. It encapsulates all SQL queries and
/// data access logic behind the [`LedgerStore`] and [`LedgerTx`] traits.
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    /// Creates a new `PgLedgerStore` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_column<T: FromStr>(column: &'static str, raw: String) -> Result<T, StoreError> {
    raw.parse::<T>().map_err(|_| StoreError::Decode(column, raw))
}

fn account_from_row(row: &PgRow) -> Result<Account, StoreError> {
    Ok(Account {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        account_number: row.try_get("account_number")?,
        balance: row.try_get("balance")?,
        blocked_balance: row.try_get("blocked_balance")?,
        total_invested: row.try_get("total_invested")?,
        total_profit_loss: row.try_get("total_profit_loss")?,
        status: parse_column("accounts.status", row.try_get("status")?)?,
        max_position_size: row.try_get("max_position_size")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn order_from_row(row: &PgRow) -> Result<Order, StoreError> {
    Ok(Order {
        id: row.try_get("id")?,
        account_id: row.try_get("account_id")?,
        symbol: row.try_get("symbol")?,
        side: parse_column("orders.side", row.try_get("side")?)?,
        order_type: parse_column("orders.order_type", row.try_get("order_type")?)?,
        quantity: row.try_get("quantity")?,
        limit_price: row.try_get("limit_price")?,
        stop_price: row.try_get("stop_price")?,
        status: parse_column("orders.status", row.try_get("status")?)?,
        filled_quantity: row.try_get("filled_quantity")?,
        total_executed_value: row.try_get("total_executed_value")?,
        fees: row.try_get("fees")?,
        reserved_amount: row.try_get("reserved_amount")?,
        time_in_force: parse_column("orders.time_in_force", row.try_get("time_in_force")?)?,
        executed_at: row.try_get("executed_at")?,
        cancelled_at: row.try_get("cancelled_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn position_from_row(row: &PgRow) -> Result<Position, StoreError> {
    Ok(Position {
        id: row.try_get("id")?,
        account_id: row.try_get("account_id")?,
        symbol: row.try_get("symbol")?,
        quantity: row.try_get("quantity")?,
        average_price: row.try_get("average_price")?,
        total_cost: row.try_get("total_cost")?,
        realized_pnl: row.try_get("realized_pnl")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

const ORDER_COLUMNS: &str = "id, account_id, symbol, side, order_type, quantity, limit_price, stop_price, status, filled_quantity, total_executed_value, fees, reserved_amount, time_in_force, executed_at, cancelled_at, created_at, updated_at";

const POSITION_COLUMNS: &str =
    "id, account_id, symbol, quantity, average_price, total_cost, realized_pnl, created_at, updated_at";

const ACCOUNT_COLUMNS: &str = "id, user_id, account_number, balance, blocked_balance, total_invested, total_profit_loss, status, max_position_size, created_at, updated_at";

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgLedgerTx { tx }))
    }

    async fn create_account(
        &self,
        user_id: Uuid,
        account_number: &str,
        opening_balance: Decimal,
    ) -> Result<Account, StoreError> {
        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            user_id,
            account_number: account_number.to_string(),
            balance: round_money(opening_balance),
            blocked_balance: Decimal::ZERO,
            total_invested: Decimal::ZERO,
            total_profit_loss: Decimal::ZERO,
            status: AccountStatus::Active,
            max_position_size: None,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO accounts (id, user_id, account_number, balance, blocked_balance, total_invested, total_profit_loss, status, max_position_size, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(account.id)
        .bind(account.user_id)
        .bind(&account.account_number)
        .bind(account.balance)
        .bind(account.blocked_balance)
        .bind(account.total_invested)
        .bind(account.total_profit_loss)
        .bind(account.status.as_str())
        .bind(account.max_position_size)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(account)
    }

    async fn account(&self, account_id: Uuid) -> Result<Account, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::AccountNotFound(account_id))?;
        account_from_row(&row)
    }

    async fn order(&self, order_id: Uuid) -> Result<Order, StoreError> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::OrderNotFound(order_id))?;
        order_from_row(&row)
    }

    async fn orders(
        &self,
        account_id: Uuid,
        filter: &OrderFilter,
    ) -> Result<Vec<Order>, StoreError> {
        let mut sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE account_id = $1");
        let mut idx = 1;
        if filter.status.is_some() {
            idx += 1;
            sql.push_str(&format!(" AND status = ${idx}"));
        }
        if filter.symbol.is_some() {
            idx += 1;
            sql.push_str(&format!(" AND symbol = ${idx}"));
        }
        idx += 1;
        sql.push_str(&format!(" ORDER BY created_at DESC LIMIT ${idx}"));

        let mut query = sqlx::query(&sql).bind(account_id);
        if let Some(status) = filter.status {
            query = query.bind(status.as_str());
        }
        if let Some(symbol) = &filter.symbol {
            query = query.bind(symbol.trim().to_uppercase());
        }
        query = query.bind(filter.effective_limit());

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(order_from_row).collect()
    }

    async fn positions(&self, account_id: Uuid) -> Result<Vec<Position>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {POSITION_COLUMNS} FROM positions WHERE account_id = $1 ORDER BY symbol ASC"
        ))
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(position_from_row).collect()
    }

    async fn position(
        &self,
        account_id: Uuid,
        symbol: &str,
    ) -> Result<Option<Position>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {POSITION_COLUMNS} FROM positions WHERE account_id = $1 AND symbol = $2"
        ))
        .bind(account_id)
        .bind(symbol.trim().to_uppercase())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(position_from_row).transpose()
    }
}

/// One open Postgres transaction. `SELECT ... FOR UPDATE` reads take row
/// locks that are held until commit or rollback, which serializes concurrent
/// mutations of the same account.
pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn account_for_update(&mut self, account_id: Uuid) -> Result<Account, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1 FOR UPDATE"
        ))
        .bind(account_id)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or(StoreError::AccountNotFound(account_id))?;
        account_from_row(&row)
    }

    async fn order_for_update(&mut self, order_id: Uuid) -> Result<Order, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(order_id)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or(StoreError::OrderNotFound(order_id))?;
        order_from_row(&row)
    }

    async fn position_for_update(
        &mut self,
        account_id: Uuid,
        symbol: &str,
    ) -> Result<Option<Position>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {POSITION_COLUMNS} FROM positions WHERE account_id = $1 AND symbol = $2 FOR UPDATE"
        ))
        .bind(account_id)
        .bind(symbol.trim().to_uppercase())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.as_ref().map(position_from_row).transpose()
    }

    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO orders (id, account_id, symbol, side, order_type, quantity, limit_price, stop_price, status, filled_quantity, total_executed_value, fees, reserved_amount, time_in_force, executed_at, cancelled_at, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)",
        )
        .bind(order.id)
        .bind(order.account_id)
        .bind(&order.symbol)
        .bind(order.side.as_str())
        .bind(order.order_type.as_str())
        .bind(order.quantity)
        .bind(order.limit_price)
        .bind(order.stop_price)
        .bind(order.status.as_str())
        .bind(order.filled_quantity)
        .bind(order.total_executed_value)
        .bind(order.fees)
        .bind(order.reserved_amount)
        .bind(order.time_in_force.as_str())
        .bind(order.executed_at)
        .bind(order.cancelled_at)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_order(&mut self, order: &Order) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE orders SET status = $2, filled_quantity = $3, total_executed_value = $4, fees = $5, reserved_amount = $6, executed_at = $7, cancelled_at = $8, updated_at = $9 WHERE id = $1",
        )
        .bind(order.id)
        .bind(order.status.as_str())
        .bind(order.filled_quantity)
        .bind(order.total_executed_value)
        .bind(order.fees)
        .bind(order.reserved_amount)
        .bind(order.executed_at)
        .bind(order.cancelled_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_account(&mut self, account: &Account) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE accounts SET balance = $2, blocked_balance = $3, total_invested = $4, total_profit_loss = $5, status = $6, max_position_size = $7, updated_at = $8 WHERE id = $1",
        )
        .bind(account.id)
        .bind(account.balance)
        .bind(account.blocked_balance)
        .bind(account.total_invested)
        .bind(account.total_profit_loss)
        .bind(account.status.as_str())
        .bind(account.max_position_size)
        .bind(account.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn upsert_position(&mut self, position: &Position) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO positions (id, account_id, symbol, quantity, average_price, total_cost, realized_pnl, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) ON CONFLICT (account_id, symbol) DO UPDATE SET quantity = EXCLUDED.quantity, average_price = EXCLUDED.average_price, total_cost = EXCLUDED.total_cost, realized_pnl = EXCLUDED.realized_pnl, updated_at = EXCLUDED.updated_at",
        )
        .bind(position.id)
        .bind(position.account_id)
        .bind(&position.symbol)
        .bind(position.quantity)
        .bind(position.average_price)
        .bind(position.total_cost)
        .bind(position.realized_pnl)
        .bind(position.created_at)
        .bind(position.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_position(&mut self, position_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM positions WHERE id = $1")
            .bind(position_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let Self { tx } = *self;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        let Self { tx } = *self;
        tx.rollback().await?;
        Ok(())
    }
}
