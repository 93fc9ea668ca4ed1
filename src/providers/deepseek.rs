//! DeepSeek chat completions provider

use super::base::{http_client, non_empty, ContentProvider};
use crate::config::DeepSeekConfig;
use crate::error::{ForgeError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// DeepSeek provider
///
/// Sends the prompt as a single user message to the OpenAI-compatible
/// `/v1/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct DeepSeekProvider {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl DeepSeekProvider {
    /// Create a new DeepSeek provider
    ///
    /// # Arguments
    ///
    /// * `config` - DeepSeek configuration
    /// * `timeout_seconds` - Per-request HTTP timeout
    ///
    /// # Errors
    ///
    /// Returns `ForgeError::Config` if no API key is configured
    pub fn new(config: &DeepSeekConfig, timeout_seconds: u64) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ForgeError::Config("DeepSeek API key is not set".to_string()))?;

        let endpoint = format!(
            "{}/v1/chat/completions",
            config.api_base.trim_end_matches('/')
        );

        tracing::info!(
            "Initialized DeepSeek provider: endpoint={}, model={}",
            endpoint,
            config.model
        );

        Ok(Self {
            client: http_client(timeout_seconds)?,
            api_key,
            endpoint,
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl ContentProvider for DeepSeekProvider {
    fn name(&self) -> &'static str {
        "deepseek"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("DeepSeek request failed: {}", e);
                ForgeError::Provider(format!("DeepSeek request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("DeepSeek returned error {}: {}", status, error_text);
            return Err(ForgeError::Provider(format!(
                "DeepSeek returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse DeepSeek response: {}", e);
            ForgeError::Provider(format!("Failed to parse DeepSeek response: {}", e))
        })?;

        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content);
        non_empty(self.name(), text)
    }
}
