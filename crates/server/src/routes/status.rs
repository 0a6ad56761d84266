//! Knowledge base status banner

use axum::{Json, extract::State};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct StatusResponse {
    message: String,
    total_cases: usize,
    indexed_documents: usize,
    embedding_model: String,
    llm_model: String,
    index_fingerprint: String,
    cached_indexes: usize,
}

/// GET /status - Case database summary
pub async fn get(State(state): State<AppState>) -> Json<StatusResponse> {
    let db = state.retriever.database();
    let index = state.retriever.index();
    let llm_model = state.session.answers().model_name().to_string();

    Json(StatusResponse {
        message: format!("Database: {} cases | LLM: {}", db.total_cases(), llm_model),
        total_cases: db.total_cases(),
        indexed_documents: index.len(),
        embedding_model: index.model_name().to_string(),
        llm_model,
        index_fingerprint: index.fingerprint().to_string(),
        cached_indexes: state.index_cache.len().await,
    })
}
