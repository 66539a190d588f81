use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedwatchError {
    #[error("Fetch failed: {0}")]
    FetchFailed(#[from] reqwest::Error),

    #[error("Feed parsing error: {0}")]
    ParseFailed(String),

    #[error("Record store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Notification delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl From<rusqlite::Error> for FeedwatchError {
    fn from(e: rusqlite::Error) -> Self {
        FeedwatchError::StoreUnavailable(format!("database: {}", e))
    }
}

impl From<serde_json::Error> for FeedwatchError {
    fn from(e: serde_json::Error) -> Self {
        FeedwatchError::StoreUnavailable(format!("malformed ledger: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, FeedwatchError>;
