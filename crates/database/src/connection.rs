use crate::error::StoreError;
use dotenvy::dotenv;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::env;
use std::time::Duration;

// A small pool suffices: the ledger is driven by one process, and row locks
// serialize writers per account anyway.
const POOL_SIZE: u32 = 5;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens the PostgreSQL connection pool for the ledger.
///
/// The connection string comes from `DATABASE_URL`, read from the process
/// environment or a `.env` file. The returned pool is cheap to clone and is
/// shared by every store handle.
pub async fn connect() -> Result<PgPool, StoreError> {
    // A missing .env file is fine; the variable may be set directly.
    dotenv().ok();

    let database_url = env::var("DATABASE_URL")
        .map_err(|_e| StoreError::ConnectionConfigError("DATABASE_URL must be set.".to_string()))?;

    let pool = PgPoolOptions::new()
        .max_connections(POOL_SIZE)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(&database_url)
        .await?;

    tracing::info!("database connection pool established");
    Ok(pool)
}

/// Applies any pending migrations from this crate's `migrations/` directory.
///
/// The binary calls this at startup so the ledger tables always match the
/// code that is about to use them.
pub async fn run_migrations(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
