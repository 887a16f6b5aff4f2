use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("Failed to reach the quote provider: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("The quote provider returned an error: status {0}: {1}")]
    Provider(u16, String),

    #[error("Symbol {0} not found")]
    SymbolNotFound(String),

    #[error("Failed to deserialize the quote response: {0}")]
    Deserialization(String),

    #[error("The API token is not a valid header value")]
    InvalidToken,
}
