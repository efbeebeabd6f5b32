//! Language-model completion client.
//!
//! The summarizer only depends on the [`CompletionClient`] trait; the
//! OpenAI-compatible HTTP implementation lives here as well.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::error::{BiblioError, Result};

/// Default OpenAI-compatible API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Failure reported by a completion provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompletionError {
    /// Rate limiting, timeouts, transient network or server failures
    #[error("{0}")]
    Retryable(String),

    /// Authentication failures, malformed requests, permanent rejections
    #[error("{0}")]
    Fatal(String),
}

impl CompletionError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = format!("LLM API error: {} - {}", status, body);
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS
            || status == reqwest::StatusCode::REQUEST_TIMEOUT
            || status.is_server_error()
        {
            CompletionError::Retryable(message)
        } else {
            CompletionError::Fatal(message)
        }
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() || e.is_request() {
            CompletionError::Retryable(format!("Network error: {}", e))
        } else if e.is_decode() {
            CompletionError::Fatal(format!("Failed to parse LLM response: {}", e))
        } else {
            match e.status() {
                Some(status) => CompletionError::from_status(status, &e.to_string()),
                None => CompletionError::Retryable(format!("Network error: {}", e)),
            }
        }
    }
}

/// Anything that turns a prompt into generated text.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn complete(
        &self,
        prompt: &str,
        model: &str,
        temperature: f32,
    ) -> std::result::Result<String, CompletionError>;
}

/// Connection settings for an OpenAI-compatible endpoint
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
}

/// OpenAI-compatible API response structures
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client for OpenAI and compatible servers.
pub struct OpenAiClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl OpenAiClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(BiblioError::Config(
                "LLM API key is empty (set OPENAI_API_KEY or pass --llm-key)".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| BiblioError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(
        &self,
        prompt: &str,
        model: &str,
        temperature: f32,
    ) -> std::result::Result<String, CompletionError> {
        let request_body = serde_json::json!({
            "model": model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
            "temperature": temperature,
        });

        debug!(model = %model, prompt_chars = prompt.len(), "Sending LLM request");

        let response = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(CompletionError::from_status(status, &error_text));
        }

        let api_response: ChatCompletionResponse = response.json().await?;

        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| CompletionError::Fatal("LLM response contained no choices".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_status_classification() {
        for status in [
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::REQUEST_TIMEOUT,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
        ] {
            assert!(matches!(
                CompletionError::from_status(status, ""),
                CompletionError::Retryable(_)
            ));
        }

        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::UNAUTHORIZED,
            StatusCode::FORBIDDEN,
            StatusCode::NOT_FOUND,
            StatusCode::UNPROCESSABLE_ENTITY,
        ] {
            assert!(matches!(
                CompletionError::from_status(status, ""),
                CompletionError::Fatal(_)
            ));
        }
    }

    #[test]
    fn test_error_message_keeps_body() {
        let err = CompletionError::from_status(StatusCode::UNAUTHORIZED, "invalid api key");
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("invalid api key"));
    }

    #[test]
    fn test_rejects_empty_key() {
        let result = OpenAiClient::new(LlmConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: "  ".to_string(),
        });
        assert!(matches!(result, Err(BiblioError::Config(_))));
    }

    #[test]
    fn test_endpoint_trims_slash() {
        let client = OpenAiClient::new(LlmConfig {
            base_url: "http://localhost:11434/v1/".to_string(),
            api_key: "sk-test".to_string(),
        })
        .unwrap();
        assert_eq!(client.endpoint(), "http://localhost:11434/v1/chat/completions");
    }

    #[test]
    fn test_parse_chat_response() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"- ponto"}}],"usage":null}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("- ponto"));
    }
}
