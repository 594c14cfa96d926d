//! Query intent classification
//!
//! A mini-model call decides what the user wants and which ticker they
//! mean. The classifier never fails: malformed model output or a failed
//! call falls back to a deterministic regex heuristic.

use arix_llm::{CompletionProvider, CompletionRequest};
use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

/// What the user is asking for
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    /// Asking for analysis of a specific stock
    StockAnalysis,
    /// General knowledge question
    GeneralQuestion,
    /// Could not tell
    Unclear,
}

impl QueryIntent {
    fn parse(value: &str) -> Self {
        match value {
            "stock_analysis" => Self::StockAnalysis,
            "general_question" => Self::GeneralQuestion,
            _ => Self::Unclear,
        }
    }
}

/// Classifier output for one user message
#[derive(Debug, Clone)]
pub struct QueryAnalysis {
    /// Uppercase ticker symbol, when one was found
    pub ticker: Option<String>,
    /// Detected intent
    pub intent: QueryIntent,
    /// Original message with the ticker token removed
    pub cleaned_question: String,
    /// Classifier confidence in [0, 1]
    pub confidence: f32,
}

static TICKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"\b([A-Z]{3})\b").unwrap()
});

static JSON_OBJECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"(?s)\{.*\}").unwrap()
});

/// Keywords that mark a message as asking for stock analysis
const ANALYSIS_KEYWORDS: &[&str] = &[
    "phân tích",
    "báo cáo",
    "đánh giá",
    "thế nào",
    "như thế nào",
    "thông tin",
    "có nên mua",
    "có nên bán",
    "triển vọng",
    "dự báo",
    "khuyến nghị",
    "giá mục tiêu",
];

const CLASSIFIER_SYSTEM_PROMPT: &str = r#"Bạn là một AI phân tích câu hỏi về chứng khoán.
Nhiệm vụ: Phân tích câu hỏi của user và trả về JSON với format sau:

{
  "ticker": "MÃ_CỔ_PHIẾU" hoặc null (nếu không tìm thấy),
  "intent": "stock_analysis" | "general_question" | "unclear",
  "cleanedQuestion": "Câu hỏi đã được làm sạch, bỏ mã cổ phiếu",
  "confidence": 0.0-1.0
}

Quy tắc:
1. Mã cổ phiếu VN thường là 3 ký tự viết hoa (VIC, VNM, HPG, FPT, VCB, TCB, MWG, etc.)
2. Intent "stock_analysis" nếu user hỏi về phân tích, đánh giá, thông tin, triển vọng cổ phiếu
3. Intent "general_question" nếu user hỏi về kiến thức chung (P/E là gì, EBITDA, etc.)
4. Intent "unclear" nếu không rõ ý định
5. cleanedQuestion: Câu hỏi gốc nhưng bỏ mã cổ phiếu (nếu có)

Ví dụ:
Input: "Phân tích cổ phiếu VIC cho tôi"
Output: {"ticker": "VIC", "intent": "stock_analysis", "cleanedQuestion": "Phân tích cổ phiếu cho tôi", "confidence": 0.95}

Input: "P/E ratio là gì?"
Output: {"ticker": null, "intent": "general_question", "cleanedQuestion": "P/E ratio là gì?", "confidence": 0.95}

CHỈ TRẢ VỀ JSON, KHÔNG GHI GÌ THÊM."#;

/// Intent classifier backed by a mini model with a deterministic fallback
pub struct QueryClassifier {
    provider: Arc<dyn CompletionProvider>,
    mini_model: String,
}

impl QueryClassifier {
    /// Create a classifier using the given provider and mini model
    pub fn new(provider: Arc<dyn CompletionProvider>, mini_model: impl Into<String>) -> Self {
        Self {
            provider,
            mini_model: mini_model.into(),
        }
    }

    /// Classify a user message; never fails
    pub async fn classify(&self, message: &str) -> QueryAnalysis {
        let request = CompletionRequest::simple(
            &self.mini_model,
            message,
            Some(CLASSIFIER_SYSTEM_PROMPT.to_string()),
        );

        match self.provider.complete(request).await {
            Ok(response) => match parse_classifier_response(&response.message, message) {
                Some(analysis) => {
                    debug!(ticker = ?analysis.ticker, intent = ?analysis.intent, "query analyzed");
                    analysis
                }
                None => {
                    warn!("failed to parse classifier output, using fallback");
                    fallback_analysis(message)
                }
            },
            Err(e) => {
                warn!(error = %e, "query classification call failed, using fallback");
                fallback_analysis(message)
            }
        }
    }
}

/// Parse the first brace-delimited JSON object out of the model response
fn parse_classifier_response(response: &str, original_message: &str) -> Option<QueryAnalysis> {
    let raw_json = JSON_OBJECT_RE.find(response)?.as_str();
    let raw: RawClassifierOutput = serde_json::from_str(raw_json).ok()?;

    Some(QueryAnalysis {
        ticker: raw
            .ticker
            .filter(|t| !t.is_empty())
            .map(|t| t.to_uppercase()),
        intent: raw
            .intent
            .as_deref()
            .map_or(QueryIntent::Unclear, QueryIntent::parse),
        cleaned_question: raw
            .cleaned_question
            .unwrap_or_else(|| original_message.to_string()),
        confidence: raw.confidence.unwrap_or(0.5),
    })
}

/// Regex heuristic used when the model path fails
pub fn fallback_analysis(message: &str) -> QueryAnalysis {
    let ticker = TICKER_RE
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());

    let lowered = message.to_lowercase();
    let has_analysis_intent = ANALYSIS_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword));

    match ticker {
        Some(ticker) if has_analysis_intent => {
            let cleaned = message.replace(&ticker, "").trim().to_string();
            QueryAnalysis {
                ticker: Some(ticker),
                intent: QueryIntent::StockAnalysis,
                cleaned_question: cleaned,
                confidence: 0.7,
            }
        }
        _ => QueryAnalysis {
            ticker: None,
            intent: QueryIntent::GeneralQuestion,
            cleaned_question: message.to_string(),
            confidence: 0.6,
        },
    }
}

#[derive(Debug, Deserialize)]
struct RawClassifierOutput {
    ticker: Option<String>,
    intent: Option<String>,
    #[serde(rename = "cleanedQuestion")]
    cleaned_question: Option<String>,
    confidence: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use arix_llm::{CompletionResponse, LlmError, Result as LlmResult};
    use async_trait::async_trait;

    struct FakeProvider {
        reply: Option<String>,
    }

    #[async_trait]
    impl CompletionProvider for FakeProvider {
        async fn complete(&self, _request: CompletionRequest) -> LlmResult<CompletionResponse> {
            match &self.reply {
                Some(reply) => Ok(CompletionResponse {
                    message: reply.clone(),
                    usage: None,
                }),
                None => Err(LlmError::RequestFailed("model down".to_string())),
            }
        }

        fn name(&self) -> &'static str {
            "fake"
        }
    }

    #[tokio::test]
    async fn test_model_path_parses_json() {
        let classifier = QueryClassifier::new(
            Arc::new(FakeProvider {
                reply: Some(
                    r#"{"ticker": "vnm", "intent": "stock_analysis", "cleanedQuestion": "thế nào?", "confidence": 0.9}"#
                        .to_string(),
                ),
            }),
            "mini",
        );

        let analysis = classifier.classify("VNM thế nào?").await;
        assert_eq!(analysis.ticker.as_deref(), Some("VNM"));
        assert_eq!(analysis.intent, QueryIntent::StockAnalysis);
        assert_eq!(analysis.cleaned_question, "thế nào?");
        assert!((analysis.confidence - 0.9).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_model_path_extracts_json_from_prose() {
        let classifier = QueryClassifier::new(
            Arc::new(FakeProvider {
                reply: Some(
                    r#"Kết quả phân tích: {"ticker": null, "intent": "general_question", "cleanedQuestion": "P/E là gì?", "confidence": 0.95} -- hết"#
                        .to_string(),
                ),
            }),
            "mini",
        );

        let analysis = classifier.classify("P/E là gì?").await;
        assert_eq!(analysis.ticker, None);
        assert_eq!(analysis.intent, QueryIntent::GeneralQuestion);
    }

    #[tokio::test]
    async fn test_unparseable_output_falls_back() {
        let classifier = QueryClassifier::new(
            Arc::new(FakeProvider {
                reply: Some("xin lỗi, tôi không chắc".to_string()),
            }),
            "mini",
        );

        let analysis = classifier.classify("phân tích VNM").await;
        // Fallback: ticker + analysis keyword
        assert_eq!(analysis.ticker.as_deref(), Some("VNM"));
        assert_eq!(analysis.intent, QueryIntent::StockAnalysis);
        assert!((analysis.confidence - 0.7).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_provider_error_falls_back() {
        let classifier = QueryClassifier::new(Arc::new(FakeProvider { reply: None }), "mini");

        let analysis = classifier.classify("xin chào").await;
        assert_eq!(analysis.intent, QueryIntent::GeneralQuestion);
        assert!((analysis.confidence - 0.6).abs() < f32::EPSILON);
    }

    #[test]
    fn test_fallback_ticker_with_keyword() {
        let analysis = fallback_analysis("phân tích VNM");
        assert_eq!(analysis.ticker.as_deref(), Some("VNM"));
        assert_eq!(analysis.intent, QueryIntent::StockAnalysis);
        assert_eq!(analysis.cleaned_question, "phân tích");
        assert!((analysis.confidence - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_fallback_ticker_without_keyword() {
        let analysis = fallback_analysis("VNM");
        assert_eq!(analysis.ticker, None);
        assert_eq!(analysis.intent, QueryIntent::GeneralQuestion);
        assert_eq!(analysis.cleaned_question, "VNM");
        assert!((analysis.confidence - 0.6).abs() < f32::EPSILON);
    }

    #[test]
    fn test_fallback_keyword_without_ticker() {
        let analysis = fallback_analysis("cho tôi báo cáo thị trường");
        assert_eq!(analysis.ticker, None);
        assert_eq!(analysis.intent, QueryIntent::GeneralQuestion);
    }

    #[test]
    fn test_fallback_ignores_lowercase_tokens() {
        let analysis = fallback_analysis("phân tích vnm");
        assert_eq!(analysis.ticker, None);
    }

    #[test]
    fn test_unknown_intent_string_becomes_unclear() {
        let analysis = parse_classifier_response(
            r#"{"ticker": "HPG", "intent": "buy_now", "cleanedQuestion": "q", "confidence": 0.8}"#,
            "q",
        )
        .unwrap();
        assert_eq!(analysis.intent, QueryIntent::Unclear);
    }

    #[test]
    fn test_missing_fields_get_defaults() {
        let analysis = parse_classifier_response(r#"{"ticker": "FPT"}"#, "câu gốc").unwrap();
        assert_eq!(analysis.ticker.as_deref(), Some("FPT"));
        assert_eq!(analysis.intent, QueryIntent::Unclear);
        assert_eq!(analysis.cleaned_question, "câu gốc");
        assert!((analysis.confidence - 0.5).abs() < f32::EPSILON);
    }
}
