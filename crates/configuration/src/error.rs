use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration sources: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Rejected configuration: {0}")]
    Invalid(String),
}
