//! Case retrieval: exact diagnosis-code match, then vector similarity

mod index;
mod retriever;

pub use index::{IndexCache, VectorIndex, cosine_similarity, fingerprint};
pub use retriever::Retriever;

use inacbg_core::Document;
use serde::Serialize;

/// How a case was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// The query named one of the case's diagnosis codes
    Code,
    /// Nearest neighbour in embedding space
    Semantic,
}

/// One retrieved case
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub document: Document,
    /// Cosine similarity, for semantic hits only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    pub matched_by: MatchKind,
}
