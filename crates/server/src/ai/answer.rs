//! Retrieval-augmented answer generation
//!
//! Retrieves the top cases for a question, renders them into a fixed context
//! block, and asks the LLM for a structured answer in one call.

use std::sync::Arc;

use serde::Serialize;

use super::{AiError, LanguageModel};
use crate::retrieval::{Retriever, SearchHit};

/// Prefix of the answer substituted when generation fails
const FAILURE_PREFIX: &str = "Maaf, terjadi kesalahan";

/// Outcome of answering one question
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    /// Set when generation failed and `text` is the substitute apology
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Ids of the cases used as context
    pub sources: Vec<String>,
}

/// Render one retrieved case as a context block
fn context_block(hit: &SearchHit) -> String {
    let case = &hit.document.metadata;
    let diagnosis = if case.diagnosis.is_empty() {
        "N/A"
    } else {
        case.diagnosis.as_str()
    };
    format!(
        "\nDIAGNOSA: {}\nKODE ICD: {}\nPROSEDUR: {}\nASPEK KODING: {}\nPERHATIAN KHUSUS: {}\n---",
        diagnosis,
        case.codes.join(", "),
        case.procedure().unwrap_or("Tidak ada prosedur khusus"),
        case.coding_aspects().unwrap_or("N/A"),
        case.special_attention().unwrap_or("Tidak ada"),
    )
}

/// Context section for a set of retrieved cases
pub fn build_context(hits: &[SearchHit]) -> String {
    hits.iter().map(context_block).collect::<Vec<_>>().join("\n")
}

/// Full prompt sent to the LLM
pub fn build_prompt(hits: &[SearchHit], query: &str) -> String {
    let context = build_context(hits);
    format!(
        r#"Kamu adalah ahli koding ICD-10 dan INA-CBG. Jawab dengan RINGKAS, AKURAT, dan TERSTRUKTUR.

KONTEKS DATABASE:
{context}

PERTANYAAN: {query}

INSTRUKSI:
1. Jawab LANGSUNG dengan struktur:
   - DIAGNOSA: (singkat)
   - KODE ICD-10/ICD-9: (list dengan penjelasan 1 kalimat)
   - PROSEDUR: (jika ada)
   - ASPEK KODING: (poin penting saja, max 3-4 poin)
   - PERHATIAN KHUSUS: (jika ada, max 2-3 poin)

2. ATURAN PENTING:
   - Jawab PADAT dan FOKUS (hindari pengulangan)
   - Jika ada kode kombinasi, jelaskan secara SINGKAT
   - Jika info tidak lengkap di konteks, katakan "Tidak ditemukan dalam database"
   - Gunakan bullet points (•) untuk list

3. FORMAT CONTOH:
DIAGNOSA: [nama diagnosa lengkap]

KODE ICD-10: 
• A01.0 - Typhoid fever
• A09 - Tidak dikoding jika sudah ada A01.0

PROSEDUR: [jika ada, jika tidak: "Tidak ada prosedur khusus"]

ASPEK KODING:
• [poin penting 1]
• [poin penting 2]

PERHATIAN KHUSUS: [jika ada, singkat saja]

Jawaban:"#
    )
}

/// Answers questions from retrieved case context
#[derive(Clone)]
pub struct AnswerGenerator {
    retriever: Arc<Retriever>,
    model: Arc<dyn LanguageModel>,
    top_k: usize,
}

impl AnswerGenerator {
    pub fn new(retriever: Arc<Retriever>, model: Arc<dyn LanguageModel>, top_k: usize) -> Self {
        Self {
            retriever,
            model,
            top_k,
        }
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    async fn try_answer(&self, query: &str) -> Result<(String, Vec<String>), AiError> {
        let hits = self.retriever.retrieve(query, self.top_k).await?;
        let sources = hits.iter().map(|h| h.document.metadata.id.clone()).collect();
        tracing::info!(hits = hits.len(), "Retrieved context for question");

        let prompt = build_prompt(&hits, query);
        let text = self.model.complete(&prompt).await?;
        Ok((text, sources))
    }

    /// Answer a question. Failures are logged and replaced by an apology
    /// carrying the error; there is no retry.
    pub async fn answer(&self, query: &str) -> Answer {
        match self.try_answer(query).await {
            Ok((text, sources)) => Answer {
                text,
                error: None,
                sources,
            },
            Err(e) => {
                tracing::error!(error = %e, model = self.model_name(), "Answer generation failed");
                Answer {
                    text: format!("{}: {}", FAILURE_PREFIX, e),
                    error: Some(e.to_string()),
                    sources: Vec::new(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::MatchKind;
    use inacbg_core::{Case, Document};

    fn hit(procedure: Option<&str>, attention: Option<&str>) -> SearchHit {
        SearchHit {
            document: Document::metadata_only(&Case {
                id: "7".to_string(),
                primary_diagnosis: None,
                diagnosis: "Demam tifoid".to_string(),
                codes: vec!["A01.0".to_string(), "A09".to_string()],
                category: "Infeksi".to_string(),
                procedure: procedure.map(String::from),
                coding_aspects: Some("A09 tidak dikoding".to_string()),
                special_attention: attention.map(String::from),
                keywords: vec![],
            }),
            score: None,
            matched_by: MatchKind::Code,
        }
    }

    #[test]
    fn test_context_block_defaults() {
        let context = build_context(&[hit(None, Some(""))]);
        assert_eq!(
            context,
            "\nDIAGNOSA: Demam tifoid\nKODE ICD: A01.0, A09\nPROSEDUR: Tidak ada prosedur khusus\n\
             ASPEK KODING: A09 tidak dikoding\nPERHATIAN KHUSUS: Tidak ada\n---"
        );
    }

    #[test]
    fn test_context_joins_blocks() {
        let context = build_context(&[hit(Some("Kultur darah"), None), hit(None, Some("Cek Widal"))]);
        assert_eq!(context.matches("---").count(), 2);
        assert!(context.contains("PROSEDUR: Kultur darah"));
        assert!(context.contains("PERHATIAN KHUSUS: Cek Widal"));
    }

    #[test]
    fn test_prompt_contains_context_and_question() {
        let prompt = build_prompt(&[hit(None, None)], "Bagaimana koding tifoid?");
        assert!(prompt.starts_with("Kamu adalah ahli koding ICD-10 dan INA-CBG."));
        assert!(prompt.contains("KONTEKS DATABASE:\n\nDIAGNOSA: Demam tifoid"));
        assert!(prompt.contains("PERTANYAAN: Bagaimana koding tifoid?"));
        assert!(prompt.ends_with("Jawaban:"));
    }

    #[test]
    fn test_prompt_with_placeholder_in_question() {
        let prompt = build_prompt(&[], "apa arti {context}?");
        assert!(prompt.contains("PERTANYAAN: apa arti {context}?"));
    }
}
