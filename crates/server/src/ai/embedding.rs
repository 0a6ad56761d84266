//! Text embedding providers.
//!
//! - [`HuggingFaceEmbedder`] — Hugging Face inference feature-extraction.
//! - [`OpenAiEmbedder`] — any OpenAI-compatible `/embeddings` endpoint.
//! - [`OllamaEmbedder`] — a local Ollama instance's `/api/embed`.
//! - `LocalEmbedder` — in-process fastembed model (`local-embeddings` feature).
//!
//! Requests are not retried; a failed call fails the caller.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};

use super::AiError;
use crate::config::{EmbeddingConfig, EmbeddingProvider};

/// Turns a batch of texts into vectors, one per text, in input order
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier, part of the index cache key
    fn model_name(&self) -> &str;

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AiError>;
}

/// Embed a single query text
pub async fn embed_query(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>, AiError> {
    embedder
        .embed(&[text.to_string()])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AiError::InvalidResponse("Empty embedding response".to_string()))
}

/// Build the embedder selected by configuration
pub fn create_embedder(
    config: &EmbeddingConfig,
    http: reqwest::Client,
) -> Result<Arc<dyn Embedder>, AiError> {
    let url = || {
        config
            .url
            .clone()
            .ok_or_else(|| AiError::Unavailable("EMBEDDING_URL is required".to_string()))
    };

    match config.provider {
        EmbeddingProvider::HuggingFace => Ok(Arc::new(HuggingFaceEmbedder {
            http,
            url: url()?,
            token: config.api_key.clone(),
            model: config.model.clone(),
        })),
        EmbeddingProvider::OpenAi => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                AiError::Unavailable("OPENAI_API_KEY or EMBEDDING_API_KEY is required".to_string())
            })?;
            Ok(Arc::new(OpenAiEmbedder {
                http,
                url: url()?,
                api_key,
                model: config.model.clone(),
            }))
        }
        EmbeddingProvider::Ollama => Ok(Arc::new(OllamaEmbedder {
            http,
            url: url()?,
            model: config.model.clone(),
        })),
        #[cfg(feature = "local-embeddings")]
        EmbeddingProvider::Local => Ok(Arc::new(LocalEmbedder::new(&config.model)?)),
        #[cfg(not(feature = "local-embeddings"))]
        EmbeddingProvider::Local => Err(AiError::Unavailable(
            "Local embeddings require building with --features local-embeddings".to_string(),
        )),
    }
}

async fn post_json(
    service: &'static str,
    request: reqwest::RequestBuilder,
    body: &JsonValue,
) -> Result<JsonValue, AiError> {
    let response = request.json(body).send().await?;
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(AiError::Api {
            service,
            status: status.as_u16(),
            message,
        });
    }
    response
        .json::<JsonValue>()
        .await
        .map_err(|e| AiError::InvalidResponse(format!("{} returned invalid JSON: {}", service, e)))
}

fn to_vector(value: &JsonValue) -> Option<Vec<f32>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}

/// Mean over token vectors, for endpoints that skip pooling
fn mean_pool(tokens: &[Vec<f32>]) -> Option<Vec<f32>> {
    let dims = tokens.first()?.len();
    if tokens.iter().any(|t| t.len() != dims) {
        return None;
    }
    let mut pooled = vec![0.0f32; dims];
    for token in tokens {
        for (acc, v) in pooled.iter_mut().zip(token) {
            *acc += v;
        }
    }
    let n = tokens.len() as f32;
    pooled.iter_mut().for_each(|v| *v /= n);
    Some(pooled)
}

// ============ Hugging Face ============

/// Hugging Face inference `feature-extraction` pipeline
pub struct HuggingFaceEmbedder {
    http: reqwest::Client,
    url: String,
    token: Option<String>,
    model: String,
}

#[async_trait]
impl Embedder for HuggingFaceEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AiError> {
        let endpoint = format!(
            "{}/{}/pipeline/feature-extraction",
            self.url.trim_end_matches('/'),
            self.model
        );
        let mut request = self.http.post(endpoint);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let json = post_json("Hugging Face", request, &json!({ "inputs": texts })).await?;
        parse_hf_response(&json, texts.len())
    }
}

/// Accepts pooled (`[[f32]]`) or token-level (`[[[f32]]]`) output
fn parse_hf_response(json: &JsonValue, expected: usize) -> Result<Vec<Vec<f32>>, AiError> {
    let items = json
        .as_array()
        .ok_or_else(|| AiError::InvalidResponse("expected an array of embeddings".to_string()))?;

    let vectors = items
        .iter()
        .map(|item| {
            to_vector(item).or_else(|| {
                let tokens: Option<Vec<Vec<f32>>> = item.as_array()?.iter().map(to_vector).collect();
                mean_pool(&tokens?)
            })
        })
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| AiError::InvalidResponse("malformed embedding array".to_string()))?;

    check_count(vectors, expected)
}

fn check_count(vectors: Vec<Vec<f32>>, expected: usize) -> Result<Vec<Vec<f32>>, AiError> {
    if vectors.len() != expected {
        return Err(AiError::InvalidResponse(format!(
            "expected {} embeddings, got {}",
            expected,
            vectors.len()
        )));
    }
    Ok(vectors)
}

// ============ OpenAI-compatible ============

/// OpenAI-compatible `POST /embeddings`
pub struct OpenAiEmbedder {
    http: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AiError> {
        let request = self
            .http
            .post(format!("{}/embeddings", self.url.trim_end_matches('/')))
            .bearer_auth(&self.api_key);
        let json = post_json(
            "OpenAI",
            request,
            &json!({ "model": self.model, "input": texts }),
        )
        .await?;
        parse_openai_response(&json, texts.len())
    }
}

/// Extracts `data[].embedding`, ordered by `data[].index`
fn parse_openai_response(json: &JsonValue, expected: usize) -> Result<Vec<Vec<f32>>, AiError> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| AiError::InvalidResponse("missing data array".to_string()))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let vector = item
            .get("embedding")
            .and_then(to_vector)
            .ok_or_else(|| AiError::InvalidResponse("missing embedding".to_string()))?;
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(position);
        indexed.push((index, vector));
    }
    indexed.sort_by_key(|(index, _)| *index);

    check_count(indexed.into_iter().map(|(_, v)| v).collect(), expected)
}

// ============ Ollama ============

/// Local Ollama `POST /api/embed`
pub struct OllamaEmbedder {
    http: reqwest::Client,
    url: String,
    model: String,
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AiError> {
        let request = self
            .http
            .post(format!("{}/api/embed", self.url.trim_end_matches('/')));
        let json = post_json(
            "Ollama",
            request,
            &json!({ "model": self.model, "input": texts }),
        )
        .await?;

        let vectors = json
            .get("embeddings")
            .and_then(|e| e.as_array())
            .ok_or_else(|| AiError::InvalidResponse("missing embeddings array".to_string()))?
            .iter()
            .map(to_vector)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| AiError::InvalidResponse("embedding is not a number array".to_string()))?;

        check_count(vectors, texts.len())
    }
}

// ============ Local (fastembed) ============

#[cfg(feature = "local-embeddings")]
pub use local::LocalEmbedder;

#[cfg(feature = "local-embeddings")]
mod local {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::{AiError, Embedder};

    /// In-process embedding model. Downloaded on first use, then cached.
    pub struct LocalEmbedder {
        name: String,
        model: Arc<Mutex<fastembed::TextEmbedding>>,
    }

    impl LocalEmbedder {
        pub fn new(name: &str) -> Result<Self, AiError> {
            let kind = match name.rsplit('/').next().unwrap_or(name) {
                "paraphrase-multilingual-mpnet-base-v2" => {
                    fastembed::EmbeddingModel::ParaphraseMLMpnetBaseV2
                }
                "multilingual-e5-small" => fastembed::EmbeddingModel::MultilingualE5Small,
                "multilingual-e5-base" => fastembed::EmbeddingModel::MultilingualE5Base,
                "multilingual-e5-large" => fastembed::EmbeddingModel::MultilingualE5Large,
                other => {
                    return Err(AiError::Unavailable(format!(
                        "Unknown local embedding model: '{}'",
                        other
                    )));
                }
            };
            let model = fastembed::TextEmbedding::try_new(fastembed::InitOptions::new(kind))
                .map_err(|e| {
                    AiError::Unavailable(format!("Failed to initialize local embedding model: {}", e))
                })?;

            Ok(Self {
                name: name.to_string(),
                model: Arc::new(Mutex::new(model)),
            })
        }
    }

    #[async_trait]
    impl Embedder for LocalEmbedder {
        fn model_name(&self) -> &str {
            &self.name
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AiError> {
            let model = Arc::clone(&self.model);
            let texts = texts.to_vec();
            tokio::task::spawn_blocking(move || {
                let mut model = model
                    .lock()
                    .map_err(|_| AiError::Unavailable("embedding model lock poisoned".to_string()))?;
                model
                    .embed(texts, None)
                    .map_err(|e| AiError::Unavailable(format!("Local embedding failed: {}", e)))
            })
            .await
            .map_err(|e| AiError::Unavailable(format!("Embedding task failed: {}", e)))?
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hf_pooled() {
        let json = json!([[0.1, 0.2], [0.3, 0.4]]);
        let vectors = parse_hf_response(&json, 2).unwrap();
        assert_eq!(vectors, vec![vec![0.1f32, 0.2], vec![0.3, 0.4]]);
    }

    #[test]
    fn test_parse_hf_token_level_is_mean_pooled() {
        let json = json!([[[1.0, 2.0], [3.0, 4.0]]]);
        let vectors = parse_hf_response(&json, 1).unwrap();
        assert_eq!(vectors, vec![vec![2.0f32, 3.0]]);
    }

    #[test]
    fn test_parse_hf_count_mismatch() {
        let json = json!([[0.1, 0.2]]);
        assert!(parse_hf_response(&json, 2).is_err());
    }

    #[test]
    fn test_parse_hf_error_object() {
        let json = json!({"error": "Model is loading"});
        assert!(matches!(
            parse_hf_response(&json, 1),
            Err(AiError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_openai_orders_by_index() {
        let json = json!({
            "data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]
        });
        let vectors = parse_openai_response(&json, 2).unwrap();
        assert_eq!(vectors, vec![vec![1.0f32, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_mean_pool_rejects_ragged() {
        assert!(mean_pool(&[vec![1.0], vec![1.0, 2.0]]).is_none());
        assert!(mean_pool(&[]).is_none());
    }

    #[test]
    fn test_create_openai_requires_key() {
        let config = EmbeddingConfig {
            provider: EmbeddingProvider::OpenAi,
            model: "text-embedding-3-small".to_string(),
            url: Some("https://api.openai.com/v1".to_string()),
            api_key: None,
            batch_size: 32,
        };
        assert!(create_embedder(&config, reqwest::Client::new()).is_err());
    }

    #[test]
    fn test_create_huggingface() {
        let config = EmbeddingConfig {
            provider: EmbeddingProvider::HuggingFace,
            model: "sentence-transformers/paraphrase-multilingual-mpnet-base-v2".to_string(),
            url: Some("https://router.huggingface.co/hf-inference/models".to_string()),
            api_key: None,
            batch_size: 32,
        };
        let embedder = create_embedder(&config, reqwest::Client::new()).unwrap();
        assert_eq!(
            embedder.model_name(),
            "sentence-transformers/paraphrase-multilingual-mpnet-base-v2"
        );
    }
}
