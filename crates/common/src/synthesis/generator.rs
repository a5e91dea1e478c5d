//! Generative backends

use crate::config::GenerationConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SOURCE_NAME: &str = "generator";

/// Single-turn prompt completion
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;

    fn model_name(&self) -> &str;
}

/// OpenAI-compatible `/chat/completions` client
pub struct ChatGenerator {
    config: GenerationConfig,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

impl ChatGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| AppError::Configuration {
            message: "generation.api_key is required when generation is enabled".to_string(),
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            config: config.clone(),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl Generator for ChatGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::unavailable(SOURCE_NAME, format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::unavailable(
                SOURCE_NAME,
                format!("API error {}: {}", status, body),
            ));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::unavailable(SOURCE_NAME, format!("bad response: {e}")))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .ok_or_else(|| AppError::unavailable(SOURCE_NAME, "empty completion"))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_key() {
        let config = GenerationConfig {
            enabled: true,
            ..GenerationConfig::default()
        };
        assert!(matches!(
            ChatGenerator::new(&config),
            Err(AppError::Configuration { .. })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_unavailable() {
        let config = GenerationConfig {
            enabled: true,
            endpoint: "http://127.0.0.1:1/v1/chat/completions".into(),
            api_key: Some("test".into()),
            timeout_secs: 2,
            ..GenerationConfig::default()
        };
        let generator = ChatGenerator::new(&config).unwrap();
        let err = generator.generate("hello").await.unwrap_err();
        assert!(err.is_degradable());
    }

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            model: "m",
            messages: vec![ChatMessage {
                role: "user",
                content: "q",
            }],
            max_tokens: 256,
            temperature: 0.1,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["max_tokens"], 256);
    }
}
