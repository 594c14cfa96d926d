//! Query classification, context fusion and analysis orchestration
//!
//! The pieces between the HTTP layer and the external collaborators:
//!
//! - [`query`]: what is the user asking, and about which ticker
//! - [`fusion`]: assemble price, broker PDF and financial statement data
//!   into one bounded prompt body, primary sources first
//! - [`engine`]: run the full pipeline and relay the fused prompt to the
//!   completion provider
//! - [`prompts`]: the Vietnamese persona and instruction texts

pub mod engine;
pub mod error;
pub mod fusion;
pub mod prompts;
pub mod query;

pub use engine::{AnalysisConfig, AnalysisEngine, StockAnalysis};
pub use error::{AnalysisError, Result};
pub use fusion::{build_fused_context, FusionInput, RecommendationTally};
pub use query::{fallback_analysis, QueryAnalysis, QueryClassifier, QueryIntent};
