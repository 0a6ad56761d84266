//! Health check endpoint

use axum::{Json, extract::State};
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    cases: usize,
    indexed_documents: usize,
}

/// GET /health - Report liveness and the size of the loaded knowledge base
pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        cases: state.retriever.database().cases.len(),
        indexed_documents: state.retriever.index().len(),
    })
}
