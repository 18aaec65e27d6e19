// src/error.rs

//! Unified error handling for the lotto crawler.
//!
//! Each ingestion stage has its own error type so callers can tell a
//! row-local rejection apart from a run-aborting failure:
//!
//! - [`ParseError`]: one raw row was rejected; the batch carries on.
//! - [`FetchError`]: the remote page could not be read; the run is abandoned.
//! - [`StoreError`]: the database refused the batch or a read query failed.
//!
//! [`AppError`] wraps all of them together with the ambient failures
//! (configuration, I/O, serving).

use std::fmt;

use thiserror::Error;

/// Result type alias for application operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// A raw row that could not become a draw record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Too few cells, or a blank game type
    #[error("malformed row: {0}")]
    MalformedRow(String),

    /// Draw date matched none of the accepted formats
    #[error("invalid draw date '{0}'")]
    InvalidDate(String),

    /// Jackpot is not a non-negative decimal
    #[error("invalid jackpot '{0}'")]
    InvalidJackpot(String),

    /// Winner count is not a non-negative integer
    #[error("invalid winners '{0}'")]
    InvalidWinners(String),
}

/// Failure to retrieve raw rows from the results page.
#[derive(Error, Debug)]
pub enum FetchError {
    /// A hidden postback token was absent from the search page
    #[error("search form is missing hidden field '{field}'")]
    MissingFormState { field: String },

    /// Network, timeout or HTTP status failure
    #[error("results page unavailable: {0}")]
    Unavailable(String),

    /// The page no longer has the expected markup
    #[error("results page markup changed: {0}")]
    SchemaChanged(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        Self::Unavailable(e.to_string())
    }
}

/// Failure inside the draw store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The batch transaction could not be opened or committed; nothing was written
    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    /// A read query or connection-level operation failed
    #[error("query failed: {0}")]
    Query(String),
}

impl StoreError {
    pub fn transaction(message: impl fmt::Display) -> Self {
        Self::TransactionFailed(message.to_string())
    }

    pub fn query(message: impl fmt::Display) -> Self {
        Self::Query(message.to_string())
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Query(e.to_string())
    }
}

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Row parsing failed
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Fetching from the results page failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Store operation failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// HTTP server error
    #[error("Server error: {0}")]
    Server(String),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a server error.
    pub fn server(message: impl fmt::Display) -> Self {
        Self::Server(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_errors_convert_into_app_error() {
        let err: AppError = ParseError::InvalidDate("13/45/2024".into()).into();
        assert!(matches!(err, AppError::Parse(ParseError::InvalidDate(_))));
        assert_eq!(err.to_string(), "invalid draw date '13/45/2024'");

        let err: AppError = StoreError::transaction("disk I/O error").into();
        assert!(matches!(err, AppError::Store(StoreError::TransactionFailed(_))));
    }

    #[test]
    fn missing_form_state_names_the_field() {
        let err = FetchError::MissingFormState {
            field: "__EVENTVALIDATION".into(),
        };
        assert!(err.to_string().contains("__EVENTVALIDATION"));
    }
}
