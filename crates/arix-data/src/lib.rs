//! External market data adapters for arix-rs
//!
//! Three collaborators the analysis pipeline depends on, each behind a
//! capability trait so the orchestrator can be tested with fakes:
//!
//! - [`reports`]: broker analysis report metadata, filtered by recency
//! - [`price`]: OHLCV bar series and the derived summary text
//! - [`extract`]: PDF document download and text extraction

pub mod error;
pub mod extract;
pub mod price;
pub mod reports;

pub use error::{DataError, Result};
pub use extract::{extract_all, DocumentExtractor, PdfExtractor, UNREADABLE_PLACEHOLDER};
pub use price::{
    format_for_prompt, format_market_overview, summarize, IqxPriceClient, OhlcSeries,
    PriceSource, PriceSummary, Trend,
};
pub use reports::{filter_reports_by_age, ReportMetadata, ReportSource, SimplizeClient};
