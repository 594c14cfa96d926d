//! Completion request and response types

use crate::Message;
use serde::{Deserialize, Serialize};

/// Request for a chat completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier (provider-specific)
    pub model: String,

    /// Conversation messages, in order
    pub messages: Vec<Message>,

    /// Optional system prompt, prepended to the messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Maximum tokens to generate
    pub max_tokens: usize,

    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Response from a chat completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Generated assistant text
    pub message: String,

    /// Token usage reported by the provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

/// Token usage statistics, as reported on the wire
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt
    pub prompt_tokens: usize,

    /// Tokens in the generated completion
    pub completion_tokens: usize,

    /// Total tokens billed for the call
    pub total_tokens: usize,
}

impl CompletionRequest {
    /// Create a builder for completion requests
    pub fn builder(model: impl Into<String>) -> CompletionRequestBuilder {
        CompletionRequestBuilder::new(model)
    }

    /// Shorthand for a single user message, with an optional system prompt
    pub fn simple(
        model: impl Into<String>,
        user_message: impl Into<String>,
        system: Option<String>,
    ) -> Self {
        let mut builder = Self::builder(model).add_message(Message::user(user_message));
        if let Some(system) = system {
            builder = builder.system(system);
        }
        builder.build()
    }
}

/// Builder for [`CompletionRequest`]
pub struct CompletionRequestBuilder {
    model: String,
    messages: Vec<Message>,
    system: Option<String>,
    max_tokens: usize,
    temperature: Option<f32>,
}

impl CompletionRequestBuilder {
    /// Create a new builder
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            system: None,
            max_tokens: 1024,
            temperature: None,
        }
    }

    /// Set the conversation messages
    pub fn messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    /// Add a single message
    pub fn add_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Set the system prompt
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the maximum tokens
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Build the completion request
    pub fn build(self) -> CompletionRequest {
        CompletionRequest {
            model: self.model,
            messages: self.messages,
            system: self.system,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;

    #[test]
    fn test_builder() {
        let request = CompletionRequest::builder("gpt-5-chat-latest")
            .add_message(Message::user("Xin chào"))
            .system("Bạn là trợ lý phân tích")
            .max_tokens(2500)
            .temperature(0.7)
            .build();

        assert_eq!(request.model, "gpt-5-chat-latest");
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.max_tokens, 2500);
        assert_eq!(request.temperature, Some(0.7));
    }

    #[test]
    fn test_simple_request() {
        let request = CompletionRequest::simple("gpt-5-mini", "hi", Some("persona".to_string()));
        assert_eq!(request.system.as_deref(), Some("persona"));
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, Role::User);
    }
}
