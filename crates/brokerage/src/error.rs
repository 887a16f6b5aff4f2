use core_types::OrderStatus;
use database::StoreError;
use market_data::MarketDataError;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum BrokerageError {
    #[error("Account {0} not found")]
    AccountNotFound(Uuid),

    #[error("Account {0} is not active")]
    AccountInactive(Uuid),

    #[error("Order {0} not found")]
    OrderNotFound(Uuid),

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Insufficient funds: available {available}, required {required}")]
    InsufficientFunds {
        available: Decimal,
        required: Decimal,
    },

    #[error("Insufficient shares of {symbol}: held {held}, requested {requested}")]
    InsufficientShares {
        symbol: String,
        held: i64,
        requested: i64,
    },

    #[error("Order value {value} exceeds the account's position size limit {limit}")]
    LimitExceeded { value: Decimal, limit: Decimal },

    #[error("Order {0} cannot be cancelled from status {1}")]
    OrderNotCancellable(Uuid, OrderStatus),

    #[error("Order {0} is not active (status {1})")]
    OrderNotActive(Uuid, OrderStatus),

    #[error("Symbol {0} is not available from the quote gateway")]
    SymbolUnavailable(String),

    #[error("Quote gateway failure: {0}")]
    QuoteUnavailable(MarketDataError),

    #[error("Ledger store failure: {0}")]
    Store(StoreError),
}

impl BrokerageError {
    /// Infrastructure failures roll back cleanly and may be retried by the
    /// caller. Business-rule failures are final.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BrokerageError::Store(_) | BrokerageError::QuoteUnavailable(_)
        )
    }
}

impl From<StoreError> for BrokerageError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AccountNotFound(id) => BrokerageError::AccountNotFound(id),
            StoreError::OrderNotFound(id) => BrokerageError::OrderNotFound(id),
            other => BrokerageError::Store(other),
        }
    }
}

impl From<MarketDataError> for BrokerageError {
    fn from(err: MarketDataError) -> Self {
        match err {
            MarketDataError::SymbolNotFound(symbol) => BrokerageError::SymbolUnavailable(symbol),
            other => BrokerageError::QuoteUnavailable(other),
        }
    }
}
