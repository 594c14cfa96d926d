//! Error types for data adapter operations

use thiserror::Error;

/// Result type alias for data adapter operations
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors from the report, price and document adapters
#[derive(Debug, Error)]
pub enum DataError {
    /// Report source returned an empty list for the ticker
    #[error("No reports found for ticker: {ticker}")]
    NoReports {
        ticker: String,
    },

    /// All fetched reports were older than the age window
    #[error("No reports found within {max_age_days} days for ticker: {ticker}")]
    NoRecentReports {
        ticker: String,
        max_age_days: i64,
    },

    /// Price source returned an empty series
    #[error("No price data available for {symbol}")]
    NoPriceData {
        symbol: String,
    },

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Upstream answered with a non-success status
    #[error("API error: {0}")]
    Api(String),

    /// Document could not be turned into text
    #[error("Failed to extract document: {0}")]
    Extraction(String),
}
