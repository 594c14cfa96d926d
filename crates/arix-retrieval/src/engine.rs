//! The retrieval engine: query intent to ordered, bounded context text

use crate::error::Result;
use crate::intent::RetrievalIntent;
use crate::period::Period;
use crate::store::{Availability, StoredPoint, VectorStore, STATISTICS_SECTION};
use arix_llm::EmbeddingProvider;
use std::sync::Arc;
use tracing::{debug, warn};

/// Bounds and take-counts for the retrieval policy
///
/// The values are carried over from the reference deployment as tuned
/// constants; none of them is semantically meaningful beyond "empirically
/// reasonable".
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Page size for the statistics scroll
    pub scroll_limit: usize,
    /// Result cap for similarity search
    pub search_limit: usize,
    /// Rows kept when only annual data is requested
    pub annual_take: usize,
    /// Rows kept when only quarterly data is requested
    pub quarterly_take: usize,
    /// Annual rows in the mixed default
    pub mixed_annual_take: usize,
    /// Quarterly rows in the mixed default
    pub mixed_quarterly_take: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            scroll_limit: 50,
            search_limit: 15,
            annual_take: 5,
            quarterly_take: 8,
            mixed_annual_take: 3,
            mixed_quarterly_take: 6,
        }
    }
}

/// Soft-fail result of a retrieval call
#[derive(Debug, Clone)]
pub struct RetrievalOutcome {
    /// Whether retrieval produced a usable context
    pub success: bool,
    /// Labeled context text, empty when nothing was retrieved
    pub context: String,
    /// Number of data points in the context
    pub data_points: usize,
    /// Failure reason when `success` is false
    pub error: Option<String>,
}

impl RetrievalOutcome {
    fn failure(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            context: String::new(),
            data_points: 0,
            error: Some(reason.into()),
        }
    }

    /// True when there is context worth adding to a prompt
    pub fn has_context(&self) -> bool {
        self.success && !self.context.is_empty()
    }
}

/// Retrieval engine over a vector store and an embedding provider
pub struct RetrievalEngine {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    config: RetrievalConfig,
}

impl RetrievalEngine {
    /// Create an engine with the default policy constants
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self::with_config(store, embedder, RetrievalConfig::default())
    }

    /// Create an engine with explicit policy constants
    pub fn with_config(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    /// Retrieve financial context for a ticker
    ///
    /// Never returns an error: a store outage or any failure along the way
    /// degrades to an unsuccessful outcome the caller can skip.
    pub async fn retrieve(&self, ticker: &str, question: Option<&str>) -> RetrievalOutcome {
        debug!(ticker, "querying financial data");

        match self.store.availability().await {
            Availability::Available => {}
            Availability::Unavailable(reason) => {
                warn!(ticker, %reason, "vector store not available, skipping financial data");
                return RetrievalOutcome::failure("vector store not available");
            }
        }

        match self.retrieve_inner(ticker, question).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(ticker, error = %e, "financial data retrieval failed");
                RetrievalOutcome::failure(e.to_string())
            }
        }
    }

    async fn retrieve_inner(
        &self,
        ticker: &str,
        question: Option<&str>,
    ) -> Result<RetrievalOutcome> {
        let intent = RetrievalIntent::detect(question);
        debug!(
            latest = intent.latest,
            annual = intent.annual,
            quarterly = intent.quarterly,
            "retrieval intent"
        );

        let points = if intent.latest {
            let all = self
                .store
                .scroll(ticker, STATISTICS_SECTION, self.config.scroll_limit)
                .await?;
            select_latest(all, intent, &self.config)
        } else if let Some(question) = question {
            let vector = self.embedder.embed(question).await?;
            self.store
                .search(&vector, ticker, self.config.search_limit)
                .await?
        } else {
            // Unreachable in practice: no question implies latest intent
            Vec::new()
        };

        debug!(count = points.len(), "retrieved data points");

        let context = render_context(&points);
        Ok(RetrievalOutcome {
            success: true,
            data_points: points.len(),
            context,
            error: None,
        })
    }
}

/// Sort by period (newest first) and apply the annual/quarterly policy
fn select_latest(
    points: Vec<StoredPoint>,
    intent: RetrievalIntent,
    config: &RetrievalConfig,
) -> Vec<StoredPoint> {
    let mut sorted: Vec<(Period, StoredPoint)> = points
        .into_iter()
        .map(|p| (Period::extract(&p.payload.text), p))
        .collect();
    sorted.sort_by(|a, b| a.0.cmp_desc(&b.0));

    if intent.annual {
        sorted
            .into_iter()
            .filter(|(period, _)| period.is_annual())
            .take(config.annual_take)
            .map(|(_, p)| p)
            .collect()
    } else if intent.quarterly {
        sorted
            .into_iter()
            .filter(|(period, _)| !period.is_annual())
            .take(config.quarterly_take)
            .map(|(_, p)| p)
            .collect()
    } else {
        // Mixed default: recent annual rows first, then recent quarters
        let annual = sorted
            .iter()
            .filter(|(period, _)| period.is_annual())
            .take(config.mixed_annual_take);
        let quarterly = sorted
            .iter()
            .filter(|(period, _)| !period.is_annual())
            .take(config.mixed_quarterly_take);
        annual.chain(quarterly).map(|(_, p)| p.clone()).collect()
    }
}

/// Render retrieved points as labeled blocks separated by blank lines
fn render_context(points: &[StoredPoint]) -> String {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let period = Period::extract(&p.payload.text);
            if period.year != 0 {
                format!(
                    "[Dữ liệu {} - Q{}/{}]\n{}",
                    i + 1,
                    period.quarter,
                    period.year,
                    p.payload.text
                )
            } else {
                format!("[Dữ liệu {}]\n{}", i + 1, p.payload.text)
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
