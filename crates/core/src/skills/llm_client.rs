//! # Chat Client
//!
//! [`CompletionService`] over an OpenAI-compatible `/chat/completions`
//! endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::models::ModelConfig;

use super::expert::CompletionService;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP completion client for one model configuration
#[derive(Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    config: ModelConfig,
    api_key: String,
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ChatClient {
    /// Create a client, reading the API key from the provider's environment variables
    pub fn new(config: ModelConfig) -> Result<Self, ServiceError> {
        let api_key = config
            .provider
            .api_key_from(|key| std::env::var(key).ok())
            .ok_or_else(|| ServiceError::MissingApiKey(config.provider.api_key_env().to_string()))?;
        Ok(Self::with_api_key(config, api_key))
    }

    pub fn with_api_key(config: ModelConfig, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            api_key: api_key.into(),
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn request<'a>(&'a self, system: &'a str, prompt: &'a str) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if !system.trim().is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        ChatRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream: false,
        }
    }
}

/// First choice's text, or an error if there is none
fn first_content(response: ChatResponse) -> Result<String, ServiceError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or(ServiceError::EmptyAnswer)
}

#[async_trait]
impl CompletionService for ChatClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ServiceError> {
        let endpoint = self.config.endpoint();
        tracing::debug!(
            provider = self.config.provider.display_name(),
            model = %self.config.model,
            temperature = self.config.temperature,
            "Invoking chat completion"
        );

        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request(system, prompt))
            .send()
            .await
            .map_err(|e| ServiceError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Decode(e.to_string()))?;
        first_content(body)
    }
}
