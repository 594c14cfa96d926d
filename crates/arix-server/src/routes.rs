//! HTTP surface: liveness and the smart chat endpoint
//!
//! Thin transport glue. Validation and serialization live here; all
//! pipeline behavior sits behind [`AppState`]'s components.

use crate::state::AppState;
use arix_analysis::{prompts, QueryIntent};
use arix_llm::{CompletionRequest, Message, TokenUsage};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api", get(health))
        .route("/api/chat", post(smart_chat))
        .layer(tower_http::cors::CorsLayer::permissive())
        .with_state(state)
}

/// Liveness marker
async fn health() -> &'static str {
    "hello"
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: Option<String>,
    model: Option<String>,
}

#[derive(Debug, Serialize)]
struct QueryAnalysisView {
    intent: QueryIntent,
    confidence: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatResponse {
    success: bool,
    #[serde(rename = "type")]
    response_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ticker: Option<String>,
    message: String,
    query_analysis: QueryAnalysisView,
    #[serde(skip_serializing_if = "Option::is_none")]
    usage: Option<TokenUsage>,
}

/// Smart chat: classify, analyze when a stock is asked about, otherwise
/// answer as a general conversation
async fn smart_chat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatRequest>,
) -> Response {
    let Some(message) = body.message.filter(|m| !m.trim().is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Message is required" })),
        )
            .into_response();
    };
    let model = body.model.as_deref();

    info!(message = %message, "smart chat request");

    let analysis = state.classifier.classify(&message).await;
    info!(
        ticker = ?analysis.ticker,
        intent = ?analysis.intent,
        confidence = analysis.confidence,
        "query analyzed"
    );

    if let Some(ticker) = analysis
        .ticker
        .as_deref()
        .filter(|_| analysis.intent == QueryIntent::StockAnalysis && analysis.confidence >= 0.5)
    {
        match state
            .engine
            .smart_analyze(ticker, &analysis.cleaned_question, model)
            .await
        {
            Ok(result) => {
                return Json(ChatResponse {
                    success: true,
                    response_type: "stock_analysis",
                    ticker: Some(result.ticker),
                    message: result.analysis,
                    query_analysis: QueryAnalysisView {
                        intent: analysis.intent,
                        confidence: analysis.confidence,
                    },
                    usage: result.usage,
                })
                .into_response();
            }
            Err(e) => {
                // The one escalation point: fall back to general chat
                warn!(ticker, error = %e, "stock analysis failed, falling back to chat");
            }
        }
    }

    let request = CompletionRequest::builder(model.unwrap_or(&state.default_model))
        .add_message(Message::user(message))
        .system(prompts::SMART_CHAT_SYSTEM_PROMPT)
        .temperature(state.temperature)
        .max_tokens(state.max_tokens)
        .build();

    match state.completions.complete(request).await {
        Ok(response) => Json(ChatResponse {
            success: true,
            response_type: "general_chat",
            ticker: None,
            message: response.message,
            query_analysis: QueryAnalysisView {
                intent: analysis.intent,
                confidence: analysis.confidence,
            },
            usage: response.usage,
        })
        .into_response(),
        Err(e) => {
            error!(error = %e, "smart chat request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Failed to process smart chat request",
                    "details": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}
