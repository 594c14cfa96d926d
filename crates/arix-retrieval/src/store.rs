//! Vector store capability interface and Qdrant REST implementation
//!
//! The store is consumed as an opaque point store that supports filtered
//! scroll and vector search. The trait keeps the retrieval engine testable
//! with in-memory fakes; [`QdrantStore`] talks to a Qdrant instance over
//! its HTTP API.

use crate::error::{Result, StoreError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

/// Section name the statistics time series is ingested under
pub const STATISTICS_SECTION: &str = "statistics-financial";

/// One financial fact stored in the vector index
///
/// `text` is the pre-rendered human-readable block the embedding was
/// computed from; `quarter` 5 is the annual-aggregate sentinel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialDataPoint {
    /// Pre-rendered text block
    pub text: String,
    /// Statement category (e.g. `statistics-financial`)
    pub section: String,
    /// Security the fact belongs to
    pub ticker: String,
    /// Reporting year, when known at ingest time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    /// Reporting quarter (5 = annual), when known at ingest time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quarter: Option<u32>,
}

/// A point returned by scroll or search
#[derive(Debug, Clone, Deserialize)]
pub struct StoredPoint {
    /// Point id
    pub id: u64,
    /// Stored payload
    pub payload: FinancialDataPoint,
}

/// A point to upsert
#[derive(Debug, Clone, Serialize)]
pub struct PointRecord {
    /// Point id
    pub id: u64,
    /// Embedding vector
    pub vector: Vec<f32>,
    /// Payload to store alongside the vector
    pub payload: FinancialDataPoint,
}

/// Result of the store availability probe
///
/// Degradation is a typed result, not a swallowed exception: callers see
/// in the signature that the store may be down and must decide what to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    /// Collection is reachable
    Available,
    /// Store or collection cannot be reached
    Unavailable(String),
}

/// Capability interface over the vector store
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Probe whether the target collection is reachable
    async fn availability(&self) -> Availability;

    /// Fetch up to `limit` points matching ticker and section, no ranking
    async fn scroll(&self, ticker: &str, section: &str, limit: usize)
        -> Result<Vec<StoredPoint>>;

    /// Similarity search over points matching the ticker
    async fn search(&self, vector: &[f32], ticker: &str, limit: usize)
        -> Result<Vec<StoredPoint>>;

    /// Create the collection when it does not exist yet
    async fn ensure_collection(&self, vector_size: usize) -> Result<()>;

    /// Drop the collection, ignoring absence
    async fn delete_collection(&self) -> Result<()>;

    /// Upsert a batch of points
    async fn upsert(&self, points: Vec<PointRecord>) -> Result<()>;

    /// Highest point id currently stored, `None` for an empty collection
    async fn max_point_id(&self) -> Result<Option<u64>>;
}

/// Qdrant REST client
#[derive(Debug, Clone)]
pub struct QdrantStore {
    client: Client,
    base_url: String,
    collection: String,
}

impl QdrantStore {
    /// Create a client for `http://{host}:{port}` and the given collection
    pub fn new(host: &str, port: u16, collection: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: format!("http://{host}:{port}"),
            collection: collection.into(),
        }
    }

    /// Collection name this client operates on
    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.base_url, self.collection)
    }

    fn must_filter(ticker: &str, section: Option<&str>) -> serde_json::Value {
        let mut must = vec![json!({ "key": "ticker", "match": { "value": ticker } })];
        if let Some(section) = section {
            must.push(json!({ "key": "section", "match": { "value": section } }));
        }
        json!({ "must": must })
    }

    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(StoreError::Api(format!("HTTP {status}: {body}")))
        }
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn availability(&self) -> Availability {
        match self.client.get(self.collection_url()).send().await {
            Ok(response) if response.status().is_success() => Availability::Available,
            Ok(response) => Availability::Unavailable(format!(
                "collection probe returned HTTP {}",
                response.status()
            )),
            Err(e) => Availability::Unavailable(e.to_string()),
        }
    }

    async fn scroll(
        &self,
        ticker: &str,
        section: &str,
        limit: usize,
    ) -> Result<Vec<StoredPoint>> {
        debug!(ticker, section, limit, "scrolling vector store");

        let body = json!({
            "filter": Self::must_filter(ticker, Some(section)),
            "limit": limit,
            "with_payload": true,
            "with_vector": false,
        });

        let response = self
            .client
            .post(format!("{}/points/scroll", self.collection_url()))
            .json(&body)
            .send()
            .await?;
        let response = Self::check_response(response).await?;

        let wire: ScrollResponse = response.json().await?;
        Ok(wire.result.points)
    }

    async fn search(
        &self,
        vector: &[f32],
        ticker: &str,
        limit: usize,
    ) -> Result<Vec<StoredPoint>> {
        debug!(ticker, limit, "searching vector store");

        let body = json!({
            "vector": vector,
            "filter": Self::must_filter(ticker, None),
            "limit": limit,
            "with_payload": true,
        });

        let response = self
            .client
            .post(format!("{}/points/search", self.collection_url()))
            .json(&body)
            .send()
            .await?;
        let response = Self::check_response(response).await?;

        let wire: SearchResponse = response.json().await?;
        Ok(wire.result)
    }

    async fn ensure_collection(&self, vector_size: usize) -> Result<()> {
        let probe = self.client.get(self.collection_url()).send().await;
        if matches!(&probe, Ok(r) if r.status().is_success()) {
            return Ok(());
        }

        let body = json!({
            "vectors": { "size": vector_size, "distance": "Cosine" }
        });

        let response = self
            .client
            .put(self.collection_url())
            .json(&body)
            .send()
            .await?;
        Self::check_response(response).await?;
        Ok(())
    }

    async fn delete_collection(&self) -> Result<()> {
        // Absence is fine, only transport errors matter here
        let _ = self.client.delete(self.collection_url()).send().await?;
        Ok(())
    }

    async fn upsert(&self, points: Vec<PointRecord>) -> Result<()> {
        let response = self
            .client
            .put(format!("{}/points", self.collection_url()))
            .json(&json!({ "points": points }))
            .send()
            .await?;
        Self::check_response(response).await?;
        Ok(())
    }

    async fn max_point_id(&self) -> Result<Option<u64>> {
        let body = json!({
            "limit": 1000,
            "with_payload": false,
            "with_vector": false,
        });

        let response = self
            .client
            .post(format!("{}/points/scroll", self.collection_url()))
            .json(&body)
            .send()
            .await?;
        let response = Self::check_response(response).await?;

        let wire: IdScrollResponse = response.json().await?;
        Ok(wire.result.points.into_iter().map(|p| p.id).max())
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ScrollResponse {
    result: ScrollResult,
}

#[derive(Debug, Deserialize)]
struct ScrollResult {
    points: Vec<StoredPoint>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    result: Vec<StoredPoint>,
}

#[derive(Debug, Deserialize)]
struct IdScrollResponse {
    result: IdScrollResult,
}

#[derive(Debug, Deserialize)]
struct IdScrollResult {
    points: Vec<IdOnlyPoint>,
}

#[derive(Debug, Deserialize)]
struct IdOnlyPoint {
    id: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_shape() {
        let filter = QdrantStore::must_filter("VNM", Some(STATISTICS_SECTION));
        let must = filter["must"].as_array().unwrap();
        assert_eq!(must.len(), 2);
        assert_eq!(must[0]["key"], "ticker");
        assert_eq!(must[0]["match"]["value"], "VNM");
        assert_eq!(must[1]["match"]["value"], STATISTICS_SECTION);
    }

    #[test]
    fn test_filter_without_section() {
        let filter = QdrantStore::must_filter("HPG", None);
        assert_eq!(filter["must"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_payload_roundtrip() {
        let point = FinancialDataPoint {
            text: "statistics-financial (Q2/2025)\nroe: 18.2".to_string(),
            section: STATISTICS_SECTION.to_string(),
            ticker: "VNM".to_string(),
            year: Some(2025),
            quarter: Some(2),
        };

        let json = serde_json::to_string(&point).unwrap();
        let back: FinancialDataPoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back.ticker, "VNM");
        assert_eq!(back.quarter, Some(2));
    }

    #[test]
    fn test_payload_tolerates_missing_period_fields() {
        let json = r#"{"text": "t", "section": "s", "ticker": "VIC"}"#;
        let point: FinancialDataPoint = serde_json::from_str(json).unwrap();
        assert_eq!(point.year, None);
        assert_eq!(point.quarter, None);
    }

    #[test]
    fn test_scroll_response_shape() {
        let json = r#"{
            "result": {
                "points": [
                    {"id": 3, "payload": {"text": "a (Q5/2024)", "section": "statistics-financial", "ticker": "VNM"}}
                ]
            }
        }"#;

        let wire: ScrollResponse = serde_json::from_str(json).unwrap();
        assert_eq!(wire.result.points.len(), 1);
        assert_eq!(wire.result.points[0].id, 3);
    }
}
