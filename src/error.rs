use serde::Serialize;
use thiserror::Error as ThisError;

/// Per-ticker provider failure.
///
/// Kept cheap to clone because a failure travels from the fetch task through the
/// cache into the rendered row.
#[derive(ThisError, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FetchError {
    /// Network error, timeout, rate limit or 5xx from the provider
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Provider reports no such symbol (delisted or invalid)
    #[error("Unknown ticker: {0}")]
    UnknownTicker(String),

    /// Payload did not match the expected schema
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl FetchError {
    /// Short label shown in the dashboard table
    pub fn label(&self) -> &'static str {
        match self {
            FetchError::ProviderUnavailable(_) => "provider unavailable",
            FetchError::UnknownTicker(_) => "unknown ticker",
            FetchError::MalformedResponse(_) => "malformed response",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::MalformedResponse(err.to_string())
        } else {
            FetchError::ProviderUnavailable(err.to_string())
        }
    }
}

#[derive(ThisError, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Persistence failure: {0}")]
    Persistence(String),

    #[error("Update aborted, {} record(s) could not be refreshed: {}", failed.len(), failed.join(", "))]
    PartialUpdate { failed: Vec<String> },

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Parse(format!("JSON error: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Network(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
