//! Single-shot HTTP question endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::Utc;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{ChatMessage, ChatResponse};

/// POST /ask - answer one question
pub async fn ask(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChatMessage>, JsonRejection>,
) -> Result<Json<ChatResponse>> {
    let Json(message) = payload.map_err(|e| Error::invalid_request(e.body_text()))?;
    let conversation_id = message.conversation_id_or_new();
    tracing::info!("Query for conversation {}: \"{}\"", conversation_id, message.query);

    let answer = state.engine().answer(&message.query).await;

    Ok(Json(ChatResponse {
        message: answer.message,
        response: answer.response,
        conversation_id,
        timestamp: Utc::now(),
        sources: Vec::new(),
    }))
}
