//! POST /chat: answers the latest user message from the ingested document.

use std::sync::Arc;

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use contextor::Conversation;
use serde::Serialize;
use serde_json::Value;

use crate::{
    core::app_state::AppState,
    error_handler::{AppError, AppResult},
};

/// Response payload for /chat.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub answer: String,
}

/// Handler: POST /chat
///
/// The body is `{ "message": string, "history": [{ "sender", "text" }] }`.
/// Both fields are optional; a malformed `history` counts as empty.
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:9000/chat \
///   -H 'content-type: application/json' \
///   -d '{"message":"What is its complexity?","history":[{"sender":"user","text":"What is quicksort?"}]}'
/// ```
pub async fn chat(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<ChatResponse>> {
    let Json(body) = body?;
    if !body.is_object() {
        return Err(AppError::BadRequest("request body must be a JSON object".into()));
    }

    let message = body.get("message").and_then(Value::as_str);
    let history = body.get("history").unwrap_or(&Value::Null);
    let conv = Conversation::from_request(history, message);

    let qa = state.pipeline.answer(&conv).await?;
    Ok(Json(ChatResponse { answer: qa.answer }))
}
