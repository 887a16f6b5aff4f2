use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to load environment variables for database connection: {0}")]
    ConnectionConfigError(String),

    #[error("Database operation failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Account {0} not found")]
    AccountNotFound(Uuid),

    #[error("Order {0} not found")]
    OrderNotFound(Uuid),

    #[error("Failed to decode column {0}: {1}")]
    Decode(&'static str, String),
}
