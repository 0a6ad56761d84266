//! Hybrid retriever.
//!
//! A query that names diagnosis codes is answered from exact code matches;
//! anything else (or a code with no matching case) goes to vector search.

use std::sync::Arc;

use inacbg_core::{CaseDatabase, Document, extract_codes};

use super::{MatchKind, SearchHit, VectorIndex};
use crate::ai::embedding::embed_query;
use crate::ai::{AiError, Embedder};

pub struct Retriever {
    database: Arc<CaseDatabase>,
    index: Arc<VectorIndex>,
    embedder: Arc<dyn Embedder>,
}

impl Retriever {
    pub fn new(
        database: Arc<CaseDatabase>,
        index: Arc<VectorIndex>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            database,
            index,
            embedder,
        }
    }

    pub fn database(&self) -> &CaseDatabase {
        &self.database
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Cases naming any code found in the query, in database order, as
    /// metadata-only documents
    pub fn code_matches(&self, query: &str, k: usize) -> Vec<SearchHit> {
        let codes = extract_codes(query);
        if codes.is_empty() {
            return Vec::new();
        }

        let hits: Vec<SearchHit> = self
            .database
            .cases_with_codes(&codes)
            .take(k)
            .map(|case| SearchHit {
                document: Document::metadata_only(case),
                score: None,
                matched_by: MatchKind::Code,
            })
            .collect();

        tracing::debug!(codes = ?codes, matches = hits.len(), "Diagnosis code lookup");
        hits
    }

    /// Up to `k` cases relevant to `query`
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, AiError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let exact = self.code_matches(query, k);
        if !exact.is_empty() {
            return Ok(exact);
        }

        if self.index.is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = embed_query(self.embedder.as_ref(), query).await?;
        Ok(self.index.search(&query_vec, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use inacbg_core::chunk_cases;

    /// Bag-of-words over a tiny vocabulary
    struct VocabEmbedder;

    const VOCAB: [&str; 4] = ["tifoid", "diare", "pneumonia", "fraktur"];

    #[async_trait]
    impl Embedder for VocabEmbedder {
        fn model_name(&self) -> &str {
            "vocab"
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AiError> {
            Ok(texts
                .iter()
                .map(|t| {
                    let lower = t.to_lowercase();
                    VOCAB.iter().map(|w| lower.matches(w).count() as f32).collect()
                })
                .collect())
        }
    }

    fn database() -> CaseDatabase {
        CaseDatabase::from_json_str(
            r#"{
                "metadata": {"total_cases": 4},
                "cases": [
                    {"id": 1, "diagnosa": "Demam tifoid", "kode_diagnosa": ["A01.0"], "kategori": "Infeksi",
                     "aspek_koding": "tifoid", "keywords": ["tifoid"]},
                    {"id": 2, "diagnosa": "Diare akut", "kode_diagnosa": ["A09"], "kategori": "Infeksi",
                     "aspek_koding": "diare", "keywords": ["diare"]},
                    {"id": 3, "diagnosa": "Diare dengan dehidrasi", "kode_diagnosa": ["A09", "E86"], "kategori": "Infeksi",
                     "aspek_koding": "diare", "keywords": ["diare"]},
                    {"id": 4, "diagnosa": "Pneumonia", "kode_diagnosa": ["J18.9"], "kategori": "Respirasi",
                     "aspek_koding": "pneumonia", "keywords": ["pneumonia"]}
                ]
            }"#,
        )
        .unwrap()
    }

    async fn retriever() -> Retriever {
        let db = database();
        let embedder: Arc<dyn Embedder> = Arc::new(VocabEmbedder);
        let index = VectorIndex::build(chunk_cases(&db), embedder.as_ref(), 16)
            .await
            .unwrap();
        Retriever::new(Arc::new(db), Arc::new(index), embedder)
    }

    fn ids(hits: &[SearchHit]) -> Vec<&str> {
        hits.iter().map(|h| h.document.metadata.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_code_query_returns_only_matching_cases() {
        let r = retriever().await;
        let hits = r.retrieve("bagaimana koding a09?", 3).await.unwrap();
        assert_eq!(ids(&hits), vec!["2", "3"]);
        for hit in &hits {
            assert!(hit.document.metadata.codes.contains(&"A09".to_string()));
            assert!(hit.document.text.is_empty());
            assert_eq!(hit.matched_by, MatchKind::Code);
        }
    }

    #[tokio::test]
    async fn test_code_matches_capped_at_k() {
        let r = retriever().await;
        assert_eq!(ids(&r.retrieve("A09", 1).await.unwrap()), vec!["2"]);
    }

    #[tokio::test]
    async fn test_unknown_code_falls_back_to_semantic() {
        let r = retriever().await;
        let hits = r.retrieve("Z99 pneumonia", 1).await.unwrap();
        assert_eq!(ids(&hits), vec!["4"]);
        assert_eq!(hits[0].matched_by, MatchKind::Semantic);
        assert!(!hits[0].document.text.is_empty());
    }

    #[tokio::test]
    async fn test_semantic_returns_exactly_k() {
        let r = retriever().await;
        let hits = r.retrieve("pasien dengan tifoid", 3).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].document.metadata.id, "1");
    }

    #[tokio::test]
    async fn test_semantic_k_exceeding_index() {
        let r = retriever().await;
        assert_eq!(r.retrieve("diare", 10).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_zero_k() {
        let r = retriever().await;
        assert!(r.retrieve("A09", 0).await.unwrap().is_empty());
    }
}
