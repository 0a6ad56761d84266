//! Conversation history handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use uuid::Uuid;

use crate::AppState;
use crate::error::AppError;

#[derive(Serialize)]
pub struct ConversationList {
    total: usize,
    conversations: Vec<inacbg_core::ConversationSummary>,
}

/// GET /conversations - Stored conversations, most recently updated first
pub async fn list(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conversations = state.session.list_conversations().await?;
    Ok(Json(ConversationList {
        total: conversations.len(),
        conversations,
    }))
}

/// POST /conversations - Start a new conversation (saved on its first message)
pub async fn create(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let view = state.session.new_conversation().await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /conversations/{id} - Read a conversation
pub async fn read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.session.conversation(id).await?))
}

/// POST /conversations/{id}/select - Make a stored conversation current
pub async fn select(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.session.select_conversation(id).await?))
}

/// DELETE /conversations/{id} - Delete a conversation
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.session.delete_conversation(id).await?))
}
