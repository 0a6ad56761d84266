//! Groq chat-completions client (OpenAI-compatible wire format)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::AiError;
use crate::config::LlmConfig;

/// A hosted model that turns one prompt into one completion
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model_name(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String, AiError>;
}

/// Client for the Groq `/chat/completions` endpoint
#[derive(Clone)]
pub struct GroqClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    temperature: f32,
    max_tokens: u32,
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

/// Request body for the chat completions API
#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

/// Response from the chat completions API
#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChatMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Error detail from the API
#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl GroqClient {
    pub fn new(http: reqwest::Client, config: &LlmConfig) -> Self {
        Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    /// Send a single user message and return the raw API response
    pub async fn send(&self, user_message: &str) -> Result<ApiResponse, AiError> {
        let request = ApiRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Some(user_message.to_string()),
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ApiError>(&body) {
                Ok(api_err) => api_err.error.message,
                Err(_) => body,
            };
            return Err(AiError::Api {
                service: "Groq",
                status,
                message,
            });
        }

        response
            .json::<ApiResponse>()
            .await
            .map_err(|e| AiError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }
}

/// Extract the first non-empty text choice from an API response
pub fn extract_text(response: &ApiResponse) -> Result<String, AiError> {
    response
        .choices
        .iter()
        .filter_map(|choice| choice.message.content.as_deref())
        .find(|text| !text.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| AiError::InvalidResponse("No text content in response".to_string()))
}

#[async_trait]
impl LanguageModel for GroqClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, AiError> {
        let response = self.send(prompt).await?;
        tracing::debug!(
            response_id = response.id.as_deref().unwrap_or("-"),
            finish_reason = response
                .choices
                .first()
                .and_then(|c| c.finish_reason.as_deref())
                .unwrap_or("-"),
            "LLM completion received"
        );
        extract_text(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text() {
        let response: ApiResponse = serde_json::from_str(
            r#"{
                "id": "chatcmpl-1",
                "choices": [
                    {"index": 0, "message": {"role": "assistant", "content": "DIAGNOSA: Demam tifoid"}, "finish_reason": "stop"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(extract_text(&response).unwrap(), "DIAGNOSA: Demam tifoid");
    }

    #[test]
    fn test_extract_text_empty_choices() {
        let response: ApiResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(
            extract_text(&response),
            Err(AiError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_endpoint_from_base_url() {
        let config = LlmConfig {
            api_key: "k".to_string(),
            model: "m".to_string(),
            base_url: "https://api.groq.com/openai/v1/".to_string(),
            temperature: 0.1,
            max_tokens: 1024,
        };
        let client = GroqClient::new(reqwest::Client::new(), &config);
        assert_eq!(client.endpoint, "https://api.groq.com/openai/v1/chat/completions");
        assert_eq!(client.model_name(), "m");
    }

    #[test]
    fn test_request_serialization() {
        let request = ApiRequest {
            model: "moonshotai/kimi-k2-instruct",
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Some("halo".to_string()),
            }],
            temperature: 0.1,
            max_tokens: 1024,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["max_tokens"], 1024);
    }
}
