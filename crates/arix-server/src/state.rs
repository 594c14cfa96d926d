//! Shared application state, wired once at startup

use crate::config::AppConfig;
use anyhow::Result;
use arix_analysis::{AnalysisConfig, AnalysisEngine, QueryClassifier};
use arix_data::{IqxPriceClient, PdfExtractor, SimplizeClient};
use arix_llm::{CompletionProvider, OpenAiConfig, OpenAiEmbedder, OpenAiProvider};
use arix_retrieval::{QdrantStore, RetrievalEngine};
use std::sync::Arc;
use std::time::Duration;

/// Everything the handlers need, built from [`AppConfig`]
pub struct AppState {
    /// Full analysis pipeline
    pub engine: AnalysisEngine,
    /// Query intent classifier
    pub classifier: QueryClassifier,
    /// Completion provider for the general chat path
    pub completions: Arc<dyn CompletionProvider>,
    /// Model used when the request does not name one
    pub default_model: String,
    /// Response token budget for general chat
    pub max_tokens: usize,
    /// Sampling temperature for general chat
    pub temperature: f32,
}

impl AppState {
    /// Construct all components from the resolved configuration
    pub fn build(config: &AppConfig) -> Result<Self> {
        let provider = Arc::new(OpenAiProvider::with_config(
            OpenAiConfig::new(config.openai_api_key.clone())
                .with_completion_url(config.openai_api_url.clone())
                .with_embedding_url(config.openai_embedding_url.clone()),
        )?);
        let completions: Arc<dyn CompletionProvider> = provider.clone();

        let embedder = Arc::new(OpenAiEmbedder::new(
            provider.clone(),
            config.embedding_model.clone(),
        ));
        let store = Arc::new(QdrantStore::new(
            &config.qdrant_host,
            config.qdrant_port,
            config.qdrant_collection.clone(),
        ));
        let retrieval = Arc::new(RetrievalEngine::new(store, embedder));

        let reports = Arc::new(SimplizeClient::new(config.simplize_api_url.clone()));
        let prices = Arc::new(IqxPriceClient::new(config.price_data_api_url.clone())?);
        let extractor = Arc::new(PdfExtractor::new(Duration::from_secs(
            config.pdf_timeout_secs,
        ))?);

        let engine = AnalysisEngine::new(
            completions.clone(),
            reports,
            prices,
            extractor,
            retrieval,
            AnalysisConfig {
                default_model: config.default_model.clone(),
                max_reports: config.max_reports_to_analyze,
                max_report_age_days: config.max_report_age_days,
                max_document_chars: config.max_pdf_text_length,
                report_char_cap: 8000,
                max_tokens: config.max_tokens,
                temperature: config.temperature,
                current_year: config.current_year,
                current_quarter: config.current_quarter,
            },
        );

        let classifier = QueryClassifier::new(completions.clone(), config.mini_model.clone());

        Ok(Self {
            engine,
            classifier,
            completions,
            default_model: config.default_model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }
}
