//! Error types for vector store operations

use thiserror::Error;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors from the vector store or the retrieval pipeline around it
#[derive(Debug, Error)]
pub enum StoreError {
    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Store answered with a non-success status
    #[error("Store error: {0}")]
    Api(String),

    /// Embedding call failed
    #[error("Embedding error: {0}")]
    Embedding(#[from] arix_llm::LlmError),

    /// Response did not have the expected shape
    #[error("Unexpected response format: {0}")]
    UnexpectedResponse(String),
}
