//! In-memory vector index over case documents.
//!
//! Search is brute-force cosine similarity; the case database is small
//! enough that an approximate index buys nothing. Built indexes are cached
//! by a fingerprint of the document collection and embedding model.

use std::collections::HashMap;
use std::sync::Arc;

use inacbg_core::Document;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use super::{MatchKind, SearchHit};
use crate::ai::{AiError, Embedder};

struct IndexEntry {
    document: Document,
    vector: Vec<f32>,
}

/// Embedded documents ready for similarity search
pub struct VectorIndex {
    fingerprint: String,
    model: String,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Embed every document and build the index.
    ///
    /// Documents are sent to the embedder in batches of `batch_size`.
    pub async fn build(
        documents: Vec<Document>,
        embedder: &dyn Embedder,
        batch_size: usize,
    ) -> Result<Self, AiError> {
        let fingerprint = fingerprint(&documents, embedder.model_name());
        let batch_size = batch_size.max(1);
        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(documents.len());

        for batch in documents.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|d| d.text.clone()).collect();
            let embedded = embedder.embed(&texts).await?;
            if embedded.len() != texts.len() {
                return Err(AiError::InvalidResponse(format!(
                    "embedder returned {} vectors for {} texts",
                    embedded.len(),
                    texts.len()
                )));
            }
            vectors.extend(embedded);
            tracing::debug!(embedded = vectors.len(), total = documents.len(), "Embedding documents");
        }

        let entries = documents
            .into_iter()
            .zip(vectors)
            .map(|(document, vector)| IndexEntry { document, vector })
            .collect();

        Ok(Self {
            fingerprint,
            model: embedder.model_name().to_string(),
            entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    /// Top-`k` documents by cosine similarity, most similar first
    pub fn search(&self, query_vec: &[f32], k: usize) -> Vec<SearchHit> {
        let mut scored: Vec<(f32, &IndexEntry)> = self
            .entries
            .iter()
            .map(|entry| (cosine_similarity(query_vec, &entry.vector), entry))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(score, entry)| SearchHit {
                document: entry.document.clone(),
                score: Some(score),
                matched_by: MatchKind::Semantic,
            })
            .collect()
    }
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns `0.0` for empty vectors, zero vectors, or vectors of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

/// Identity of a document collection as embedded by a given model
pub fn fingerprint(documents: &[Document], model: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(model.as_bytes());
    for doc in documents {
        hasher.update([0u8]);
        hasher.update(doc.text.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Process-wide cache of built indexes
#[derive(Default)]
pub struct IndexCache {
    indexes: Mutex<HashMap<String, Arc<VectorIndex>>>,
}

impl IndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached index for this collection, building it on first use.
    ///
    /// The lock is held while building so concurrent callers wait for one build.
    pub async fn get_or_build(
        &self,
        documents: Vec<Document>,
        embedder: &dyn Embedder,
        batch_size: usize,
    ) -> Result<Arc<VectorIndex>, AiError> {
        let key = fingerprint(&documents, embedder.model_name());
        let mut indexes = self.indexes.lock().await;

        if let Some(index) = indexes.get(&key) {
            tracing::debug!(fingerprint = %key, "Vector index cache hit");
            return Ok(Arc::clone(index));
        }

        tracing::info!(documents = documents.len(), model = embedder.model_name(), "Building vector index");
        let index = Arc::new(VectorIndex::build(documents, embedder, batch_size).await?);
        indexes.insert(key, Arc::clone(&index));
        Ok(index)
    }

    pub async fn len(&self) -> usize {
        self.indexes.lock().await.len()
    }
}
