//! Analysis orchestration
//!
//! Two entry points over the same collaborators: `analyze_stock` is the
//! plain multi-report synthesis, `smart_analyze` is the full pipeline with
//! recency-filtered reports, price data, RAG context and the fused prompt.
//! Collaborators are injected as capability traits; the engine owns no
//! ambient state.

use crate::error::Result;
use crate::fusion::{build_fused_context, FusionInput};
use crate::prompts;
use arix_data::{
    extract_all, format_market_overview, DocumentExtractor, PriceSource, ReportMetadata,
    ReportSource,
};
use arix_llm::{CompletionProvider, CompletionRequest, Message, TokenUsage};
use arix_retrieval::RetrievalEngine;
use std::sync::Arc;
use tracing::{info, warn};

/// Notice substituted when the price fetch fails
const PRICE_UNAVAILABLE_NOTICE: &str = "⚠️ Dữ liệu giá không khả dụng\n\n";

/// Tunables for the analysis pipeline, built once at startup
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Model used when the request does not name one
    pub default_model: String,
    /// Reports fetched per analysis
    pub max_reports: usize,
    /// Age window for the smart-analysis report filter
    pub max_report_age_days: i64,
    /// Character cap applied to each extracted document
    pub max_document_chars: usize,
    /// Character cap per primary block in the fused context
    pub report_char_cap: usize,
    /// Response token budget
    pub max_tokens: usize,
    /// Sampling temperature
    pub temperature: f32,
    /// Recency bias: the year prompts should prefer
    pub current_year: u16,
    /// Recency bias: the quarter prompts should prefer
    pub current_quarter: u8,
}

/// Result of one analysis run
#[derive(Debug, Clone)]
pub struct StockAnalysis {
    /// Uppercased ticker
    pub ticker: String,
    /// Generated analysis text
    pub analysis: String,
    /// Reports the analysis was based on
    pub reports: Vec<ReportMetadata>,
    /// Number of reports used
    pub total_reports: usize,
    /// Token usage of the completion call
    pub usage: Option<TokenUsage>,
}

/// The analysis pipeline over injected collaborators
pub struct AnalysisEngine {
    completions: Arc<dyn CompletionProvider>,
    reports: Arc<dyn ReportSource>,
    prices: Arc<dyn PriceSource>,
    extractor: Arc<dyn DocumentExtractor>,
    retrieval: Arc<RetrievalEngine>,
    config: AnalysisConfig,
}

impl AnalysisEngine {
    /// Wire up the pipeline
    pub fn new(
        completions: Arc<dyn CompletionProvider>,
        reports: Arc<dyn ReportSource>,
        prices: Arc<dyn PriceSource>,
        extractor: Arc<dyn DocumentExtractor>,
        retrieval: Arc<RetrievalEngine>,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            completions,
            reports,
            prices,
            extractor,
            retrieval,
            config,
        }
    }

    /// Plain multi-report synthesis: newest reports, no age filter
    pub async fn analyze_stock(
        &self,
        ticker: &str,
        report_count: Option<usize>,
        model: Option<&str>,
    ) -> Result<StockAnalysis> {
        let count = report_count.unwrap_or(self.config.max_reports);
        info!(ticker, count, "starting stock analysis");

        let reports = self.reports.latest_reports(ticker, count).await?;

        let urls: Vec<String> = reports.iter().map(|r| r.attached_link.clone()).collect();
        let documents =
            extract_all(self.extractor.as_ref(), &urls, self.config.max_document_chars).await;

        let user_prompt = format!(
            "{}\n\n{}",
            prompts::build_analysis_user_prompt(ticker, &reports, &documents),
            prompts::ANALYSIS_FOOTER
        );

        let request = CompletionRequest::builder(model.unwrap_or(&self.config.default_model))
            .add_message(Message::user(user_prompt))
            .system(prompts::STOCK_ANALYSIS_SYSTEM_PROMPT)
            .temperature(self.config.temperature)
            .max_tokens(self.config.max_tokens)
            .build();

        let response = self.completions.complete(request).await?;
        info!(ticker, "stock analysis completed");

        Ok(StockAnalysis {
            ticker: ticker.to_uppercase(),
            analysis: response.message,
            total_reports: reports.len(),
            reports,
            usage: response.usage,
        })
    }

    /// Full pipeline for smart chat: recency filter, price, RAG, fusion
    ///
    /// The report age filter is the one hard failure here; price and RAG
    /// degrade to placeholders instead of aborting the run.
    pub async fn smart_analyze(
        &self,
        ticker: &str,
        question: &str,
        model: Option<&str>,
    ) -> Result<StockAnalysis> {
        info!(ticker, "starting smart analysis");

        let reports = self
            .reports
            .valid_reports(ticker, self.config.max_reports, self.config.max_report_age_days)
            .await?;

        let price_text = match self.market_overview(ticker).await {
            Ok(text) => text,
            Err(e) => {
                warn!(ticker, error = %e, "could not fetch price data");
                PRICE_UNAVAILABLE_NOTICE.to_string()
            }
        };

        let urls: Vec<String> = reports.iter().map(|r| r.attached_link.clone()).collect();
        let documents =
            extract_all(self.extractor.as_ref(), &urls, self.config.max_document_chars).await;

        let retrieval = self.retrieval.retrieve(ticker, Some(question)).await;
        if retrieval.success {
            info!(ticker, data_points = retrieval.data_points, "financial data added");
        }

        let context = build_fused_context(
            &FusionInput {
                ticker,
                current_year: self.config.current_year,
                price_text: &price_text,
                reports: &reports,
                documents: &documents,
                retrieval: &retrieval,
                question,
            },
            self.config.report_char_cap,
        );
        info!(ticker, length = context.len(), "fused context built");

        let system = prompts::smart_analysis_system_prompt(
            ticker,
            self.config.current_year,
            self.config.current_quarter,
        )?;

        let request = CompletionRequest::builder(model.unwrap_or(&self.config.default_model))
            .add_message(Message::user(context))
            .system(system)
            .temperature(self.config.temperature)
            .max_tokens(self.config.max_tokens)
            .build();

        let response = self.completions.complete(request).await?;
        info!(ticker, "smart analysis completed");

        Ok(StockAnalysis {
            ticker: ticker.to_uppercase(),
            analysis: response.message,
            total_reports: reports.len(),
            reports,
            usage: response.usage,
        })
    }

    async fn market_overview(&self, ticker: &str) -> Result<String> {
        let series = self.prices.ohlc(&[ticker.to_string()], None).await?;
        Ok(format_market_overview(&series)?)
    }
}
