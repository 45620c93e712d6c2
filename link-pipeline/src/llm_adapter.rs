use crate::types::{Completion, GenerationError, Message, TokenUsage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_MODEL: &str = "openai/gpt-4o";
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// A capability that turns a short conversation into generated text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn model(&self) -> &str;

    /// Check that the generator is usable at all. A failure here is
    /// configuration-fatal for a run and is never retried.
    fn validate(&self) -> Result<(), GenerationError> {
        Ok(())
    }

    async fn complete(
        &self,
        messages: &[Message],
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> Result<Completion, GenerationError>;
}

/// Connection settings for the OpenRouter chat completions API.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

impl LlmConfig {
    /// Read `OPENROUTER_API_KEY`, `OPENROUTER_MODEL`, `OPENROUTER_BASE_URL`
    /// and `OPENROUTER_TIMEOUT_SECONDS`. A missing key is not an error here;
    /// it is reported by [`TextGenerator::validate`].
    pub fn from_env() -> Result<Self, GenerationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, GenerationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let timeout_seconds = match non_empty("OPENROUTER_TIMEOUT_SECONDS") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                GenerationError::Config(format!("OPENROUTER_TIMEOUT_SECONDS is not a number: {raw}"))
            })?,
            None => defaults.timeout_seconds,
        };

        Ok(Self {
            api_key: lookup("OPENROUTER_API_KEY").unwrap_or_default(),
            model: non_empty("OPENROUTER_MODEL").unwrap_or(defaults.model),
            base_url: non_empty("OPENROUTER_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            timeout_seconds,
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseRaw {
    choices: Vec<ChatChoice>,
    model: Option<String>,
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

/// Chat completions client for OpenRouter (or any OpenAI-compatible endpoint).
#[derive(Clone)]
pub struct OpenRouterClient {
    http_client: Client,
    config: LlmConfig,
}

impl OpenRouterClient {
    pub fn new(config: LlmConfig) -> Result<Self, GenerationError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| GenerationError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http_client, config })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }
}

#[async_trait]
impl TextGenerator for OpenRouterClient {
    fn model(&self) -> &str {
        &self.config.model
    }

    fn validate(&self) -> Result<(), GenerationError> {
        if self.config.api_key.trim().is_empty() {
            return Err(GenerationError::Config(
                "OPENROUTER_API_KEY environment variable not set".to_string(),
            ));
        }
        Ok(())
    }

    async fn complete(
        &self,
        messages: &[Message],
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> Result<Completion, GenerationError> {
        self.validate()?;

        let request = ChatRequest {
            model: &self.config.model,
            messages,
            temperature,
            max_tokens,
        };

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.config.base_url))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Chat completion request failed");
                GenerationError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "Chat completion API error");
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let raw: ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| GenerationError::Parse(e.to_string()))?;

        let text = raw
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GenerationError::Parse("Response contained no choices".to_string()))?;

        let usage = raw.usage.unwrap_or_default();
        debug!(
            model = %self.config.model,
            total_tokens = usage.total_tokens,
            "Chat completion"
        );

        Ok(Completion {
            text,
            model: raw.model.unwrap_or_else(|| self.config.model.clone()),
            usage,
        })
    }
}
