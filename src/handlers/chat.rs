use crate::chat::ChatMessage;
use crate::error::{AppError, Result};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Option<Vec<ChatMessage>>,
    #[serde(default)]
    pub product_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub messages: Vec<String>,
}

/// POST /ai/chat - Answer a conversation, optionally about one product.
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>> {
    // Malformed bodies get the same JSON error envelope as invalid conversations.
    let Json(request) = payload.map_err(|rejection| {
        metrics::counter!("chat_failures_total").increment(1);
        AppError::ValidationError(rejection.body_text())
    })?;

    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!(
        "chat",
        %request_id,
        product_id = request.product_id.as_deref().unwrap_or(""),
    );

    let start = Instant::now();
    let result = state
        .chat
        .chat(request.messages.as_deref(), request.product_id.as_deref())
        .instrument(span.clone())
        .await;
    let elapsed_ms = start.elapsed().as_millis() as f64;

    metrics::histogram!("chat_latency_ms").record(elapsed_ms);

    match result {
        Ok(messages) => {
            span.in_scope(|| tracing::info!(elapsed_ms, answers = messages.len(), "Chat answered"));
            Ok(Json(ChatResponse { messages }))
        }
        Err(err) => {
            metrics::counter!("chat_failures_total").increment(1);
            span.in_scope(|| tracing::warn!(elapsed_ms, error = %err, "Chat failed"));
            Err(err)
        }
    }
}
