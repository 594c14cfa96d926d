//! OpenAI-compatible provider implementation
//!
//! Implements [`CompletionProvider`] and [`EmbeddingProvider`] against
//! OpenAI-style HTTP endpoints. The endpoint URLs are configurable, so the
//! same provider works for api.openai.com, proxy gateways, and local
//! deployments that speak the same wire format.

use crate::{
    CompletionProvider, CompletionRequest, CompletionResponse, EmbeddingProvider, LlmError,
    Message, Result, Role, TokenUsage,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_COMPLETION_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_EMBEDDING_URL: &str = "https://api.openai.com/v1/embeddings";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for the OpenAI-compatible provider
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key for bearer authentication
    pub api_key: String,

    /// Full URL of the chat completions endpoint
    pub completion_url: String,

    /// Full URL of the embeddings endpoint
    pub embedding_url: String,

    /// Request timeout in seconds (default: 120)
    pub timeout_secs: u64,
}

impl OpenAiConfig {
    /// Create a new config with the given API key and default endpoints
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            completion_url: DEFAULT_COMPLETION_URL.to_string(),
            embedding_url: DEFAULT_EMBEDDING_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set the chat completions endpoint URL
    pub fn with_completion_url(mut self, url: impl Into<String>) -> Self {
        self.completion_url = url.into();
        self
    }

    /// Set the embeddings endpoint URL
    pub fn with_embedding_url(mut self, url: impl Into<String>) -> Self {
        self.embedding_url = url.into();
        self
    }

    /// Set the request timeout in seconds
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// OpenAI-compatible provider
///
/// One instance serves both completions and embeddings; the analysis
/// pipeline shares it across components via `Arc`.
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    /// Create a new provider with the given configuration
    pub fn with_config(config: OpenAiConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(LlmError::ConfigurationError(
                "OpenAI API key is not configured".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Create a new provider with API key and default endpoints
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(OpenAiConfig::new(api_key))
    }

    /// Get the current configuration
    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    async fn request_embedding(&self, model: &str, input: &str) -> Result<Vec<f32>> {
        let request = EmbeddingWireRequest {
            model: model.to_string(),
            input: input.to_string(),
        };

        let response = self
            .client
            .post(&self.config.embedding_url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(map_status_error(status.as_u16(), model, error_text));
        }

        let wire: EmbeddingWireResponse = response.json().await.map_err(|e| {
            LlmError::UnexpectedResponse(format!("Failed to parse embedding response: {e}"))
        })?;

        wire.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| {
                LlmError::UnexpectedResponse("No embedding in response".to_string())
            })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        debug!("Sending request to {}", self.config.completion_url);

        // System prompt goes into the messages array for OpenAI
        let wire_messages = build_wire_messages(request.system, request.messages);

        let wire_request = CompletionWireRequest {
            model: request.model.clone(),
            messages: wire_messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(&self.config.completion_url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&wire_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(map_status_error(status.as_u16(), &request.model, error_text));
        }

        let wire: CompletionWireResponse = response.json().await.map_err(|e| {
            LlmError::UnexpectedResponse(format!("Failed to parse response: {e}"))
        })?;

        let choice = wire.choices.into_iter().next().ok_or_else(|| {
            LlmError::UnexpectedResponse("No choices in response".to_string())
        })?;

        if let Some(usage) = &wire.usage {
            debug!(
                "Received response - tokens: {}/{}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        Ok(CompletionResponse {
            message: choice.message.content.unwrap_or_default(),
            usage: wire.usage,
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Embedding provider bound to a fixed model
///
/// Wraps an [`OpenAiProvider`] with the embedding model identifier so
/// consumers only deal with `text -> vector`.
pub struct OpenAiEmbedder {
    provider: std::sync::Arc<OpenAiProvider>,
    model: String,
}

impl OpenAiEmbedder {
    /// Create an embedder over a shared provider
    pub fn new(provider: std::sync::Arc<OpenAiProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.provider.request_embedding(&self.model, text).await
    }
}

fn map_status_error(status: u16, model: &str, error_text: String) -> LlmError {
    match status {
        401 => LlmError::AuthenticationFailed,
        429 => LlmError::RateLimitExceeded(error_text),
        400 => LlmError::InvalidRequest(error_text),
        404 => LlmError::ModelNotFound(model.to_string()),
        _ => LlmError::RequestFailed(format!("HTTP {status}: {error_text}")),
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct CompletionWireRequest {
    model: String,
    messages: Vec<WireMessage>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct CompletionWireResponse {
    choices: Vec<WireChoice>,
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Debug, Deserialize)]
struct WireResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingWireRequest {
    model: String,
    input: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingWireResponse {
    data: Vec<EmbeddingWireItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingWireItem {
    embedding: Vec<f32>,
}

/// Build the wire message array, with the system prompt first when present
fn build_wire_messages(system: Option<String>, messages: Vec<Message>) -> Vec<WireMessage> {
    let mut result = Vec::with_capacity(messages.len() + 1);

    if let Some(sys) = system {
        result.push(WireMessage {
            role: "system".to_string(),
            content: sys,
        });
    }

    for msg in messages {
        let role = match msg.role {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        };
        result.push(WireMessage {
            role: role.to_string(),
            content: msg.content,
        });
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_comes_first() {
        let messages = build_wire_messages(
            Some("persona".to_string()),
            vec![Message::user("câu hỏi")],
        );

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content, "persona");
        assert_eq!(messages[1].role, "user");
    }

    #[test]
    fn test_status_error_mapping() {
        assert!(matches!(
            map_status_error(401, "m", String::new()),
            LlmError::AuthenticationFailed
        ));
        assert!(matches!(
            map_status_error(429, "m", String::new()),
            LlmError::RateLimitExceeded(_)
        ));
        assert!(matches!(
            map_status_error(404, "m", String::new()),
            LlmError::ModelNotFound(_)
        ));
        assert!(matches!(
            map_status_error(503, "m", String::new()),
            LlmError::RequestFailed(_)
        ));
    }

    #[test]
    fn test_missing_api_key_rejected() {
        let result = OpenAiProvider::with_config(OpenAiConfig::new(""));
        assert!(matches!(result, Err(LlmError::ConfigurationError(_))));
    }

    #[test]
    fn test_usage_deserialization() {
        let json = r#"{
            "choices": [{"message": {"role": "assistant", "content": "xin chào"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;

        let wire: CompletionWireResponse = serde_json::from_str(json).unwrap();
        let usage = wire.usage.unwrap();
        assert_eq!(usage.prompt_tokens, 10);
        assert_eq!(usage.total_tokens, 15);
        assert_eq!(
            wire.choices[0].message.content.as_deref(),
            Some("xin chào")
        );
    }
}
