use thiserror::Error;

pub type SmartReachResult<T> = Result<T, SmartReachError>;

#[derive(Error, Debug)]
pub enum SmartReachError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid date/time format: {0}")]
    InvalidFormat(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),

    #[error("Dispatch error: {0}")]
    Dispatch(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
