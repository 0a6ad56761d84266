//! Session endpoints

use axum::{Json, extract::State, response::IntoResponse};

use crate::AppState;
use crate::error::AppError;

/// GET /session - Current identity and conversation
pub async fn get(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.session.snapshot().await?))
}

/// POST /session/reset - Forget the local identity and start over
pub async fn reset(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let view = state.session.reset().await?;
    tracing::info!(user = %view.display_id, "Identity reset");
    Ok(Json(view))
}
