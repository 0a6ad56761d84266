//! Server configuration
//!
//! Values come from environment variables, after a `.env` file (if any) has
//! been loaded. The Groq key may also live in a TOML secrets file.

use std::path::{Path, PathBuf};

use thiserror::Error;

const DEFAULT_SECRETS_FILE: &str = ".streamlit/secrets.toml";
const GROQ_KEY_NAME: &str = "GROQ_API_KEY";

/// Configuration errors that prevent the server from starting
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GROQ_API_KEY not found in {secrets_file} or the environment")]
    MissingApiKey { secrets_file: String },

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Where document embeddings come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingProvider {
    /// Hugging Face inference feature-extraction endpoint
    HuggingFace,
    /// Any OpenAI-compatible `/v1/embeddings` endpoint
    OpenAi,
    /// A local Ollama instance (`/api/embed`)
    Ollama,
    /// In-process model (requires the `local-embeddings` feature)
    Local,
}

impl EmbeddingProvider {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            "local" => Ok(Self::Local),
            _ => Err(ConfigError::InvalidValue {
                name: "EMBEDDING_PROVIDER",
                value: value.to_string(),
            }),
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            Self::HuggingFace | Self::Local => {
                "sentence-transformers/paraphrase-multilingual-mpnet-base-v2"
            }
            Self::OpenAi => "text-embedding-3-small",
            Self::Ollama => "nomic-embed-text",
        }
    }

    fn default_url(&self) -> Option<&'static str> {
        match self {
            Self::HuggingFace => Some("https://router.huggingface.co/hf-inference/models"),
            Self::OpenAi => Some("https://api.openai.com/v1"),
            Self::Ollama => Some("http://localhost:11434"),
            Self::Local => None,
        }
    }

    fn key_var(&self) -> Option<&'static str> {
        match self {
            Self::HuggingFace => Some("HF_API_TOKEN"),
            Self::OpenAi => Some("OPENAI_API_KEY"),
            Self::Ollama | Self::Local => None,
        }
    }
}

/// Embedding endpoint settings
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub model: String,
    pub url: Option<String>,
    pub api_key: Option<String>,
    /// Texts per embedding request
    pub batch_size: usize,
}

/// LLM completion settings
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub cors_origins: Vec<String>,
    pub rate_limit_rps: u32,
    pub database_file: PathBuf,
    pub history_dir: PathBuf,
    pub user_id_file: PathBuf,
    pub top_k: usize,
    pub http_timeout_secs: u64,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
}

impl Config {
    /// Load configuration from `.env`, the secrets file and environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env is normal outside development
        let _ = dotenvy::dotenv();

        let secrets_file =
            std::env::var("SECRETS_FILE").unwrap_or_else(|_| DEFAULT_SECRETS_FILE.into());
        let api_key = read_secret(Path::new(&secrets_file), GROQ_KEY_NAME)
            .or_else(|| env_non_empty(GROQ_KEY_NAME))
            .ok_or(ConfigError::MissingApiKey { secrets_file })?;

        let provider = match env_non_empty("EMBEDDING_PROVIDER") {
            Some(value) => EmbeddingProvider::parse(&value)?,
            None => EmbeddingProvider::HuggingFace,
        };
        let embedding = EmbeddingConfig {
            model: env_non_empty("EMBEDDING_MODEL")
                .unwrap_or_else(|| provider.default_model().to_string()),
            url: env_non_empty("EMBEDDING_URL").or(provider.default_url().map(String::from)),
            api_key: env_non_empty("EMBEDDING_API_KEY")
                .or_else(|| provider.key_var().and_then(env_non_empty)),
            batch_size: parse_var("EMBEDDING_BATCH_SIZE", 32)?,
            provider,
        };

        Ok(Self {
            bind_address: std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            rate_limit_rps: parse_var("RATE_LIMIT_RPS", 10)?,
            database_file: std::env::var("DATABASE_FILE")
                .unwrap_or_else(|_| "medical_database_structured.json".into())
                .into(),
            history_dir: std::env::var("HISTORY_DIR")
                .unwrap_or_else(|_| "user_histories".into())
                .into(),
            user_id_file: std::env::var("USER_ID_FILE")
                .unwrap_or_else(|_| ".streamlit_user_id".into())
                .into(),
            top_k: parse_var("RETRIEVAL_TOP_K", 3)?,
            http_timeout_secs: parse_var("HTTP_TIMEOUT_SECS", 60)?,
            llm: LlmConfig {
                api_key,
                model: std::env::var("GROQ_MODEL")
                    .unwrap_or_else(|_| "moonshotai/kimi-k2-instruct".into()),
                base_url: std::env::var("GROQ_BASE_URL")
                    .unwrap_or_else(|_| "https://api.groq.com/openai/v1".into()),
                temperature: parse_var("LLM_TEMPERATURE", 0.1)?,
                max_tokens: parse_var("LLM_MAX_TOKENS", 1024)?,
            },
            embedding,
        })
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env_non_empty(name) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        None => Ok(default),
    }
}

/// Look up a string key in a TOML secrets file
fn read_secret(path: &Path, key: &str) -> Option<String> {
    let raw = std::fs::read_to_string(path).ok()?;
    let table: toml::Table = match raw.parse() {
        Ok(table) => table,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Ignoring unparsable secrets file");
            return None;
        }
    };
    table
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Setup instructions printed when the API key is missing
pub fn api_key_help() -> &'static str {
    r#"GROQ_API_KEY is required.

Hosted deployment: add to .streamlit/secrets.toml (or the file named by SECRETS_FILE):
    GROQ_API_KEY = "your_groq_api_key_here"

Local development: create a .env file in the working directory:
    GROQ_API_KEY=your_groq_api_key_here
then restart the server.

Get a free API key at https://console.groq.com/keys"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_secret() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "GROQ_API_KEY = \"gsk_test\"\nOTHER = 1").unwrap();
        assert_eq!(
            read_secret(file.path(), "GROQ_API_KEY").as_deref(),
            Some("gsk_test")
        );
        assert_eq!(read_secret(file.path(), "OTHER"), None);
        assert_eq!(read_secret(file.path(), "MISSING"), None);
    }

    #[test]
    fn test_read_secret_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "GROQ_API_KEY = ").unwrap();
        assert_eq!(read_secret(file.path(), "GROQ_API_KEY"), None);
    }

    #[test]
    fn test_read_secret_missing_file() {
        assert_eq!(read_secret(Path::new("/nonexistent/secrets.toml"), "GROQ_API_KEY"), None);
    }

    #[test]
    fn test_embedding_provider_parse() {
        assert_eq!(EmbeddingProvider::parse("HF").unwrap(), EmbeddingProvider::HuggingFace);
        assert_eq!(EmbeddingProvider::parse(" ollama ").unwrap(), EmbeddingProvider::Ollama);
        assert!(EmbeddingProvider::parse("faiss").is_err());
    }
}
