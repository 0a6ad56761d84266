//! AI features: LLM completion, text embeddings and answer generation

pub mod answer;
pub mod client;
pub mod embedding;

pub use answer::AnswerGenerator;
pub use client::{GroqClient, LanguageModel};
pub use embedding::{Embedder, create_embedder};

use thiserror::Error;

/// Errors from the external model services
#[derive(Debug, Error)]
pub enum AiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} API error ({status}): {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Unavailable(String),
}

/// Shared HTTP client with the configured request timeout
pub fn http_client(timeout_secs: u64) -> Result<reqwest::Client, AiError> {
    Ok(reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()?)
}
