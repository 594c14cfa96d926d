//! Concrete provider implementations

mod openai;

pub use openai::{OpenAiConfig, OpenAiEmbedder, OpenAiProvider};
