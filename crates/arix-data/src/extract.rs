//! Document download and text extraction
//!
//! Each report's attached PDF is fetched and turned into plain text
//! independently. A batch settles every outcome: one unreadable document
//! becomes a placeholder in its slot and never aborts the others.

use crate::error::{DataError, Result};
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Placeholder inserted for a document that could not be read
pub const UNREADABLE_PLACEHOLDER: &str = "[Không thể đọc được nội dung báo cáo này]";

/// Capability interface for turning a document URL into plain text
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    /// Download and extract one document
    async fn extract(&self, url: &str) -> Result<String>;
}

/// PDF extractor over HTTP
#[derive(Debug, Clone)]
pub struct PdfExtractor {
    client: Client,
}

impl PdfExtractor {
    /// Create an extractor with the given download timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DocumentExtractor for PdfExtractor {
    async fn extract(&self, url: &str) -> Result<String> {
        debug!(url, "downloading document");

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(DataError::Api(format!(
                "document download returned HTTP {}",
                response.status()
            )));
        }

        let bytes = response.bytes().await?;
        let text = pdf_extract::extract_text_from_mem(&bytes)
            .map_err(|e| DataError::Extraction(e.to_string()))?;

        debug!(url, length = text.len(), "document extracted");
        Ok(text)
    }
}

/// Extract every URL concurrently, settling all outcomes
///
/// The output has the same length and order as the input: successes are
/// truncated to `max_len` characters, failures become
/// [`UNREADABLE_PLACEHOLDER`].
pub async fn extract_all(
    extractor: &dyn DocumentExtractor,
    urls: &[String],
    max_len: usize,
) -> Vec<String> {
    let tasks = urls.iter().enumerate().map(|(index, url)| async move {
        match extractor.extract(url).await {
            Ok(text) => truncate_chars(&text, max_len),
            Err(e) => {
                warn!(index = index + 1, url = url.as_str(), error = %e, "document extraction failed");
                UNREADABLE_PLACEHOLDER.to_string()
            }
        }
    });

    join_all(tasks).await
}

/// Truncate on a character boundary (texts are Vietnamese, bytes won't do)
fn truncate_chars(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        text.chars().take(max_len).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, Duration as TokioDuration, Instant};

    struct FakeExtractor {
        fail_index: Option<usize>,
        delay_ms: u64,
    }

    #[async_trait]
    impl DocumentExtractor for FakeExtractor {
        async fn extract(&self, url: &str) -> Result<String> {
            sleep(TokioDuration::from_millis(self.delay_ms)).await;

            // URLs are "doc-<n>" in these tests
            let index: usize = url.trim_start_matches("doc-").parse().unwrap();
            if self.fail_index == Some(index) {
                Err(DataError::Extraction("corrupt file".to_string()))
            } else {
                Ok(format!("nội dung báo cáo {index}"))
            }
        }
    }

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("doc-{i}")).collect()
    }

    #[tokio::test]
    async fn test_failed_slot_becomes_placeholder() {
        let extractor = FakeExtractor {
            fail_index: Some(1),
            delay_ms: 0,
        };

        let texts = extract_all(&extractor, &urls(3), 50_000).await;

        assert_eq!(texts.len(), 3);
        assert_eq!(texts[0], "nội dung báo cáo 0");
        assert_eq!(texts[1], UNREADABLE_PLACEHOLDER);
        assert_eq!(texts[2], "nội dung báo cáo 2");
    }

    #[tokio::test]
    async fn test_successes_are_truncated() {
        let extractor = FakeExtractor {
            fail_index: None,
            delay_ms: 0,
        };

        let texts = extract_all(&extractor, &urls(1), 8).await;
        assert_eq!(texts[0].chars().count(), 8);
        assert_eq!(texts[0], "nội dung");
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_runs_concurrently() {
        let extractor = FakeExtractor {
            fail_index: None,
            delay_ms: 50,
        };

        let started = Instant::now();
        let texts = extract_all(&extractor, &urls(3), 50_000).await;

        // Concurrent execution: total time is one extraction, not three
        assert_eq!(texts.len(), 3);
        assert_eq!(started.elapsed(), TokioDuration::from_millis(50));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "báo cáo";
        assert_eq!(truncate_chars(text, 3), "báo");
        assert_eq!(truncate_chars(text, 100), "báo cáo");
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let extractor = FakeExtractor {
            fail_index: None,
            delay_ms: 0,
        };
        let texts = extract_all(&extractor, &[], 100).await;
        assert!(texts.is_empty());
    }
}
