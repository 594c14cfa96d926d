//! Provider trait definitions

use crate::{CompletionRequest, CompletionResponse, Result};
use async_trait::async_trait;

/// Trait for chat completion providers
///
/// Implementations of this trait relay a completion request to a model
/// service and return the generated text plus usage metadata.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generate a completion from the model
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Get the provider name (e.g. "openai")
    fn name(&self) -> &str;
}

/// Trait for text embedding providers
///
/// Turns a text into a fixed-dimension vector for similarity search.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}
