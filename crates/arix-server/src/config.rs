//! Environment-supplied configuration
//!
//! Built once at process start and passed by reference into every
//! component constructor; no component reads ambient global state.

use anyhow::{bail, Result};
use chrono::{Datelike, Local};
use std::env;

const DEFAULT_COMPLETION_URL: &str = "https://v98store.com/v1/chat/completions";
const DEFAULT_EMBEDDING_URL: &str = "https://api.openai.com/v1/embeddings";
const DEFAULT_REPORTS_URL: &str = "https://api2.simplize.vn/api/company/analysis-report/list";
const DEFAULT_PRICE_URL: &str =
    "https://proxy.iqx.vn/proxy/trading/api/chart/OHLCChart/gap-chart";
const DEFAULT_INSIGHT_URL: &str =
    "https://proxy.iqx.vn/proxy/trading/api/iq-insight-service/v1/company";

/// Process configuration, resolved from the environment with defaults
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP listen port
    pub port: u16,
    /// API key for the completion/embedding gateway
    pub openai_api_key: String,
    /// Chat completions endpoint
    pub openai_api_url: String,
    /// Embeddings endpoint
    pub openai_embedding_url: String,
    /// Full completion model
    pub default_model: String,
    /// Mini model for query classification
    pub mini_model: String,
    /// Embedding model (3072-dimension vectors)
    pub embedding_model: String,
    /// Broker report list endpoint
    pub simplize_api_url: String,
    /// OHLC chart endpoint
    pub price_data_api_url: String,
    /// Company insight endpoint (ingestion)
    pub iqx_insight_api_url: String,
    /// Reports analyzed per request
    pub max_reports_to_analyze: usize,
    /// Report age window in days
    pub max_report_age_days: i64,
    /// Document download timeout in seconds
    pub pdf_timeout_secs: u64,
    /// Character cap per extracted document
    pub max_pdf_text_length: usize,
    /// Response token budget
    pub max_tokens: usize,
    /// Sampling temperature
    pub temperature: f32,
    /// Vector store host
    pub qdrant_host: String,
    /// Vector store port
    pub qdrant_port: u16,
    /// Vector store collection name
    pub qdrant_collection: String,
    /// Recency bias year for prompts
    pub current_year: u16,
    /// Recency bias quarter for prompts
    pub current_quarter: u8,
}

impl AppConfig {
    /// Resolve the configuration from the environment
    pub fn from_env() -> Result<Self> {
        let now = Local::now();
        let default_year = now.year() as u16;
        let default_quarter = (now.month0() / 3 + 1) as u8;

        Ok(Self {
            port: env_parse("PORT", 5999)?,
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            openai_api_url: env_or("OPENAI_API_URL", DEFAULT_COMPLETION_URL),
            openai_embedding_url: env_or("OPENAI_EMBEDDING_URL", DEFAULT_EMBEDDING_URL),
            default_model: env_or("DEFAULT_MODEL", "gpt-5-chat-latest"),
            mini_model: env_or("MINI_MODEL", "gpt-5-mini-2025-08-07"),
            embedding_model: env_or("EMBEDDING_MODEL", "text-embedding-3-large"),
            simplize_api_url: env_or("SIMPLIZE_API_URL", DEFAULT_REPORTS_URL),
            price_data_api_url: env_or("PRICE_DATA_API_URL", DEFAULT_PRICE_URL),
            iqx_insight_api_url: env_or("IQX_INSIGHT_API_URL", DEFAULT_INSIGHT_URL),
            max_reports_to_analyze: env_parse("MAX_REPORTS_TO_ANALYZE", 5)?,
            max_report_age_days: env_parse("MAX_REPORT_AGE_DAYS", 60)?,
            pdf_timeout_secs: env_parse("PDF_TIMEOUT_SECS", 30)?,
            max_pdf_text_length: env_parse("MAX_PDF_TEXT_LENGTH", 50_000)?,
            max_tokens: env_parse("MAX_TOKENS", 2500)?,
            temperature: env_parse("TEMPERATURE", 0.7)?,
            qdrant_host: env_or("QDRANT_HOST", "localhost"),
            qdrant_port: env_parse("QDRANT_PORT", 6333)?,
            qdrant_collection: env_or("QDRANT_COLLECTION", "financial_data"),
            current_year: env_parse("CURRENT_YEAR", default_year)?,
            current_quarter: env_parse("CURRENT_QUARTER", default_quarter)?,
        })
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.openai_api_key.is_empty() {
            bail!("OPENAI_API_KEY is not set");
        }
        if self.max_reports_to_analyze == 0 {
            bail!("MAX_REPORTS_TO_ANALYZE must be greater than 0");
        }
        if !(1..=5).contains(&self.current_quarter) {
            bail!("CURRENT_QUARTER must be between 1 and 5");
        }
        Ok(())
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(value) => match value.parse() {
            Ok(parsed) => Ok(parsed),
            Err(e) => bail!("invalid value for {key}: {e}"),
        },
        Err(_) => Ok(default),
    }
}
