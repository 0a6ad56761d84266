//! Medical case database
//!
//! The database is a pre-built JSON file with a `cases` array and a
//! `metadata` block. Field names follow the Indonesian source data.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize, de::Error};
use serde_json::Value as JsonValue;

use crate::error::CoreError;

/// One diagnosis/coding record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    #[serde(deserialize_with = "deserialize_case_id")]
    pub id: String,

    #[serde(rename = "diagnosa_utama", default)]
    pub primary_diagnosis: Option<String>,

    #[serde(rename = "diagnosa")]
    pub diagnosis: String,

    #[serde(rename = "kode_diagnosa", default)]
    pub codes: Vec<String>,

    #[serde(rename = "kategori", default)]
    pub category: String,

    #[serde(rename = "prosedur", default)]
    pub procedure: Option<String>,

    #[serde(rename = "aspek_koding", default)]
    pub coding_aspects: Option<String>,

    #[serde(rename = "perhatian_khusus", default)]
    pub special_attention: Option<String>,

    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Case {
    /// Whether any of `codes` appears verbatim in this case's code list
    pub fn has_any_code(&self, codes: &[String]) -> bool {
        codes.iter().any(|code| self.codes.contains(code))
    }

    pub fn primary_diagnosis(&self) -> &str {
        self.primary_diagnosis.as_deref().unwrap_or("")
    }

    /// Procedure text, `None` when absent or blank
    pub fn procedure(&self) -> Option<&str> {
        non_blank(self.procedure.as_deref())
    }

    pub fn coding_aspects(&self) -> Option<&str> {
        non_blank(self.coding_aspects.as_deref())
    }

    pub fn special_attention(&self) -> Option<&str> {
        non_blank(self.special_attention.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

/// Case ids appear as both strings and integers in exported databases
fn deserialize_case_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match JsonValue::deserialize(deserializer)? {
        JsonValue::String(s) if !s.trim().is_empty() => Ok(s),
        JsonValue::String(_) => Err(Error::custom("case id cannot be empty")),
        JsonValue::Number(n) => Ok(n.to_string()),
        _ => Err(Error::custom("case id must be a string or number")),
    }
}

/// Database-level metadata block
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseMetadata {
    #[serde(default)]
    pub total_cases: Option<usize>,
}

/// The full case database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseDatabase {
    #[serde(default)]
    pub metadata: DatabaseMetadata,
    pub cases: Vec<Case>,
}

impl CaseDatabase {
    /// Load the database from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CoreError::DatabaseNotFound(path.display().to_string()));
        }

        let raw = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Case count advertised by the metadata block, falling back to the array length
    pub fn total_cases(&self) -> usize {
        self.metadata.total_cases.unwrap_or(self.cases.len())
    }

    /// Cases whose code list intersects `codes`, in database order
    pub fn cases_with_codes<'a>(&'a self, codes: &'a [String]) -> impl Iterator<Item = &'a Case> {
        self.cases.iter().filter(move |case| case.has_any_code(codes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "metadata": {"total_cases": 2, "source": "INA-CBG Edisi 2"},
        "cases": [
            {
                "id": 1,
                "diagnosa_utama": "Demam tifoid",
                "diagnosa": "Demam tifoid tanpa komplikasi",
                "kode_diagnosa": ["A01.0"],
                "kategori": "Infeksi",
                "prosedur": null,
                "aspek_koding": "A09 tidak dikoding bersama A01.0",
                "perhatian_khusus": "",
                "keywords": ["tifoid", "demam"]
            },
            {
                "id": "C-002",
                "diagnosa": "Diare dan gastroenteritis",
                "kode_diagnosa": ["A09", "E86"],
                "kategori": "Infeksi",
                "prosedur": "Rehidrasi intravena",
                "aspek_koding": "Dehidrasi sebagai diagnosa sekunder",
                "perhatian_khusus": "Cek derajat dehidrasi",
                "keywords": []
            }
        ]
    }"#;

    #[test]
    fn test_parse_database() {
        let db = CaseDatabase::from_json_str(SAMPLE).unwrap();
        assert_eq!(db.total_cases(), 2);
        assert_eq!(db.cases[0].id, "1");
        assert_eq!(db.cases[1].id, "C-002");
        assert_eq!(db.cases[0].primary_diagnosis(), "Demam tifoid");
        assert_eq!(db.cases[1].primary_diagnosis(), "");
    }

    #[test]
    fn test_blank_optional_text_is_none() {
        let db = CaseDatabase::from_json_str(SAMPLE).unwrap();
        assert_eq!(db.cases[0].procedure(), None);
        assert_eq!(db.cases[0].special_attention(), None);
        assert_eq!(db.cases[1].procedure(), Some("Rehidrasi intravena"));
    }

    #[test]
    fn test_total_cases_falls_back_to_len() {
        let db = CaseDatabase::from_json_str(r#"{"cases": []}"#).unwrap();
        assert_eq!(db.total_cases(), 0);
    }

    #[test]
    fn test_cases_with_codes() {
        let db = CaseDatabase::from_json_str(SAMPLE).unwrap();
        let codes = vec!["E86".to_string()];
        let ids: Vec<_> = db.cases_with_codes(&codes).map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["C-002"]);
    }

    #[test]
    fn test_missing_cases_is_error() {
        let err = CaseDatabase::from_json_str(r#"{"metadata": {"total_cases": 1}}"#).unwrap_err();
        assert!(matches!(err, CoreError::InvalidJson(_)));
    }

    #[test]
    fn test_bad_case_id_is_error() {
        let json = r#"{"cases": [{"id": true, "diagnosa": "x"}]}"#;
        assert!(CaseDatabase::from_json_str(json).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = CaseDatabase::load("/nonexistent/medical_database_structured.json").unwrap_err();
        assert!(matches!(err, CoreError::DatabaseNotFound(_)));
    }
}
