//! Case-to-document chunking.
//!
//! One case becomes exactly one chunk. The text block is what gets embedded;
//! the full case travels alongside as metadata so retrieval results can be
//! rendered without another lookup.

use serde::Serialize;

use crate::case::{Case, CaseDatabase};

const MAX_DIAGNOSIS_CHARS: usize = 200;
const MAX_PROCEDURE_CHARS: usize = 150;
const MAX_CODING_ASPECT_CHARS: usize = 300;
const MAX_CODES: usize = 5;
const MAX_KEYWORDS: usize = 15;

/// A case rendered as searchable text plus its metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    /// Embedded text. Empty for metadata-only results.
    pub text: String,
    pub metadata: Case,
}

impl Document {
    /// A result carrying only case metadata
    pub fn metadata_only(case: &Case) -> Self {
        Self {
            text: String::new(),
            metadata: case.clone(),
        }
    }
}

/// Render one case into its document form
pub fn chunk_case(case: &Case) -> Document {
    let codes = case
        .codes
        .iter()
        .take(MAX_CODES)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let keywords = case
        .keywords
        .iter()
        .take(MAX_KEYWORDS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let procedure = case
        .procedure()
        .map(|p| truncate_chars(p, MAX_PROCEDURE_CHARS))
        .unwrap_or("Tidak ada");

    let text = format!(
        "ID: {id}\n\
         DIAGNOSA: {primary} - {diagnosis}\n\
         KODE: {codes}\n\
         KATEGORI: {category}\n\
         PROSEDUR: {procedure}\n\
         ASPEK KODING: {aspects}\n\
         KEYWORDS: {keywords}",
        id = case.id,
        primary = case.primary_diagnosis(),
        diagnosis = truncate_chars(&case.diagnosis, MAX_DIAGNOSIS_CHARS),
        category = case.category,
        aspects = truncate_chars(
            case.coding_aspects.as_deref().unwrap_or(""),
            MAX_CODING_ASPECT_CHARS
        ),
    );

    Document {
        text,
        metadata: case.clone(),
    }
}

/// Render every case in the database, preserving database order
pub fn chunk_cases(db: &CaseDatabase) -> Vec<Document> {
    db.cases.iter().map(chunk_case).collect()
}

/// Prefix of at most `max` characters, never splitting a code point
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(id: &str) -> Case {
        Case {
            id: id.to_string(),
            primary_diagnosis: Some("Demam tifoid".to_string()),
            diagnosis: "Demam tifoid tanpa komplikasi".to_string(),
            codes: vec!["A01.0".to_string()],
            category: "Infeksi".to_string(),
            procedure: None,
            coding_aspects: Some("A09 tidak dikoding bersama A01.0".to_string()),
            special_attention: None,
            keywords: vec!["tifoid".to_string(), "demam".to_string()],
        }
    }

    #[test]
    fn test_chunk_text_layout() {
        let doc = chunk_case(&case("17"));
        let expected = "ID: 17\n\
                        DIAGNOSA: Demam tifoid - Demam tifoid tanpa komplikasi\n\
                        KODE: A01.0\n\
                        KATEGORI: Infeksi\n\
                        PROSEDUR: Tidak ada\n\
                        ASPEK KODING: A09 tidak dikoding bersama A01.0\n\
                        KEYWORDS: tifoid, demam";
        assert_eq!(doc.text, expected);
        assert_eq!(doc.metadata.id, "17");
    }

    #[test]
    fn test_chunk_contains_id_and_primary_diagnosis() {
        for (id, primary) in [("1", "Demam berdarah"), ("abc-9", "Pneumonia"), ("42", "")] {
            let mut c = case(id);
            c.primary_diagnosis = Some(primary.to_string());
            let doc = chunk_case(&c);
            assert!(doc.text.contains(&format!("ID: {id}")));
            assert!(doc.text.contains(primary));
        }
    }

    #[test]
    fn test_chunk_truncates_long_fields() {
        let mut c = case("1");
        c.diagnosis = "é".repeat(500);
        c.codes = (0..8).map(|i| format!("B0{i}")).collect();
        c.keywords = (0..20).map(|i| format!("k{i}")).collect();
        let doc = chunk_case(&c);

        let diagnosis_line = doc.text.lines().nth(1).unwrap();
        assert_eq!(diagnosis_line.matches('é').count(), 200);
        assert!(doc.text.contains("KODE: B00, B01, B02, B03, B04\n"));
        assert!(doc.text.ends_with("k14"));
    }

    #[test]
    fn test_metadata_only_has_empty_text() {
        let doc = Document::metadata_only(&case("3"));
        assert!(doc.text.is_empty());
        assert_eq!(doc.metadata.codes, vec!["A01.0"]);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("ab", 3), "ab");
        assert_eq!(truncate_chars("ñañaña", 2), "ña");
    }
}
