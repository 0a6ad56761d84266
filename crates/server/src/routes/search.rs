//! Retrieval inspection endpoint

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::AppError;
use crate::retrieval::SearchHit;

const MAX_K: usize = 50;

/// Query parameters for retrieval search
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: String,
    k: Option<usize>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    query: String,
    codes: Vec<String>,
    total: usize,
    hits: Vec<SearchHit>,
}

/// GET /search?q=&k= - Run the retriever without calling the LLM
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, AppError> {
    if params.q.trim().is_empty() {
        return Err(AppError::BadRequest("Query parameter 'q' is required".to_string()));
    }

    let k = params.k.unwrap_or(state.top_k).min(MAX_K);
    let hits = state
        .retriever
        .retrieve(&params.q, k)
        .await
        .map_err(|e| AppError::Internal(format!("Retrieval failed: {}", e)))?;

    Ok(Json(SearchResponse {
        codes: inacbg_core::extract_codes(&params.q),
        total: hits.len(),
        hits,
        query: params.q,
    }))
}
