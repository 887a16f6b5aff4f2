use database::StoreError;
use market_data::MarketDataError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PortfolioError {
    #[error("account {0} not found")]
    AccountNotFound(Uuid),

    #[error("quote gateway failed: {0}")]
    QuoteUnavailable(#[source] MarketDataError),

    #[error("ledger store failed: {0}")]
    Store(#[source] StoreError),
}

impl From<StoreError> for PortfolioError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AccountNotFound(id) => PortfolioError::AccountNotFound(id),
            other => PortfolioError::Store(other),
        }
    }
}

impl From<MarketDataError> for PortfolioError {
    fn from(err: MarketDataError) -> Self {
        PortfolioError::QuoteUnavailable(err)
    }
}
