//! Question answering endpoint

use axum::{Json, extract::State, response::IntoResponse};
use serde::Deserialize;

use crate::AppState;
use crate::error::AppError;

/// Request body for chat
#[derive(Deserialize)]
pub struct ChatRequest {
    question: String,
}

/// POST /chat - Answer a question in the current conversation
///
/// Retrieves matching cases, asks the LLM, appends the turn and saves the
/// conversation. LLM failures still produce a (substitute) answer; the
/// `answer.error` field carries the failure.
pub async fn ask(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<impl IntoResponse, AppError> {
    tracing::info!(chars = body.question.chars().count(), "Chat request");

    let outcome = state.session.ask(&body.question).await?;
    if let Some(error) = &outcome.answer.error {
        tracing::warn!(conversation_id = %outcome.conversation_id, error = %error, "Answered with fallback");
    }

    Ok(Json(outcome))
}
