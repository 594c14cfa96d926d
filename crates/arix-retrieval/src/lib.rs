//! Vector store client and financial data retrieval engine for arix-rs
//!
//! Given a ticker and an optional free-text question, the retrieval engine
//! decides which financial data points to pull from the vector store:
//!
//! - "latest"-style questions scroll the statistics section and rank by
//!   reporting period (year, then quarter, newest first)
//! - other questions are embedded and answered by similarity search
//!
//! The engine soft-fails: a store outage or a failed call degrades to an
//! unsuccessful [`RetrievalOutcome`] that the caller can skip, it never
//! propagates an error.

pub mod engine;
pub mod error;
pub mod intent;
pub mod period;
pub mod store;

pub use engine::{RetrievalConfig, RetrievalEngine, RetrievalOutcome};
pub use error::{Result, StoreError};
pub use intent::RetrievalIntent;
pub use period::{Period, ANNUAL_QUARTER};
pub use store::{
    Availability, FinancialDataPoint, PointRecord, QdrantStore, StoredPoint, VectorStore,
};
