//! Error types for the analysis pipeline

use thiserror::Error;

/// Result type alias for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors from the analysis orchestration
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A data adapter failed (reports, prices, documents)
    #[error(transparent)]
    Data(#[from] arix_data::DataError),

    /// The completion provider failed
    #[error(transparent)]
    Llm(#[from] arix_llm::LlmError),

    /// A prompt template failed to render
    #[error("Prompt template error: {0}")]
    Template(#[from] minijinja::Error),
}
