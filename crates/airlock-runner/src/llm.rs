//! LLM backend abstraction and implementations.
//!
//! Defines an enum-based dispatch for LLM backends, avoiding the
//! dyn-compatibility issues with async trait methods. Concrete
//! implementations exist for OpenAI-compatible chat completions APIs and the
//! Anthropic Messages API. All backends communicate over HTTP via `reqwest`.
//!
//! Backends take the full multi-turn conversation (the 4-message prompt) and
//! surface the provider's finish reason so truncation recovery can trigger
//! when a response was cut off mid-thought.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::RunnerError;

/// One message of a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `system`, `user`, or `assistant`.
    pub role: String,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Build a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: String::from("system"),
            content: content.into(),
        }
    }

    /// Build a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: String::from("user"),
            content: content.into(),
        }
    }

    /// Build an assistant message (used for the deterministic fake
    /// acknowledgment turn).
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: String::from("assistant"),
            content: content.into(),
        }
    }
}

/// A completed LLM call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmResponse {
    /// The raw response text.
    pub text: String,
    /// The provider's finish reason, if reported.
    pub finish_reason: Option<String>,
}

impl LlmResponse {
    /// Whether the response hit the output-token limit mid-generation.
    pub fn truncated(&self) -> bool {
        self.finish_reason.as_deref() == Some("length")
    }
}

/// Which API family a backend speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// OpenAI-compatible `/chat/completions` (OpenAI, OpenRouter, vLLM,
    /// Ollama).
    OpenAi,
    /// Anthropic `/messages`.
    Anthropic,
}

/// Connection settings for one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmBackendConfig {
    /// Which API family to speak.
    pub backend_type: BackendType,
    /// Base URL, e.g. `https://api.openai.com/v1`.
    pub api_url: String,
    /// Bearer token or API key.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Output token budget per call.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Bounded transport-retry attempts per call.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

/// Default output budget, sized to fit a ledger + thinking + action block.
const fn default_max_tokens() -> u32 {
    3072
}

/// Default transport retries.
const fn default_max_retries() -> u32 {
    3
}

/// An LLM backend that can process a conversation and return a response.
///
/// Uses enum dispatch instead of trait objects because async methods are not
/// dyn-compatible in Rust.
pub enum LlmBackend {
    /// OpenAI-compatible chat completions API.
    OpenAi(OpenAiBackend),
    /// Anthropic Messages API.
    Anthropic(AnthropicBackend),
}

impl LlmBackend {
    /// Send a conversation and return the response text, retrying transport
    /// failures a bounded number of times.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::LlmBackend`] once every retry is exhausted.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f64,
    ) -> Result<LlmResponse, RunnerError> {
        let retries = match self {
            Self::OpenAi(b) => b.config.max_retries,
            Self::Anthropic(b) => b.config.max_retries,
        };
        let mut last_error = None;
        for attempt in 0..retries.max(1) {
            let result = match self {
                Self::OpenAi(backend) => backend.complete(messages, temperature).await,
                Self::Anthropic(backend) => backend.complete(messages, temperature).await,
            };
            match result {
                Ok(response) => return Ok(response),
                Err(err) => {
                    warn!(attempt, %err, "llm request failed");
                    last_error = Some(err);
                }
            }
        }
        Err(last_error
            .unwrap_or_else(|| RunnerError::LlmBackend(String::from("no attempts were made"))))
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Anthropic(_) => "anthropic",
        }
    }

    /// The configured model identifier.
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAi(b) => &b.config.model,
            Self::Anthropic(b) => &b.config.model,
        }
    }
}

/// Create an LLM backend from configuration.
pub fn create_backend(config: &LlmBackendConfig) -> LlmBackend {
    match config.backend_type {
        BackendType::OpenAi => LlmBackend::OpenAi(OpenAiBackend::new(config)),
        BackendType::Anthropic => LlmBackend::Anthropic(AnthropicBackend::new(config)),
    }
}

// ---------------------------------------------------------------------------
// OpenAI-compatible backend
// ---------------------------------------------------------------------------

/// Backend for OpenAI-compatible chat completions APIs.
pub struct OpenAiBackend {
    client: reqwest::Client,
    config: LlmBackendConfig,
}

impl OpenAiBackend {
    /// Create a new OpenAI-compatible backend.
    pub fn new(config: &LlmBackendConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config: config.clone(),
        }
    }

    /// Send a conversation and return the response text.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f64,
    ) -> Result<LlmResponse, RunnerError> {
        let url = format!("{}/chat/completions", self.config.api_url);
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": temperature,
            "max_tokens": self.config.max_tokens,
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| RunnerError::LlmBackend(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unable to read error body"));
            return Err(RunnerError::LlmBackend(format!(
                "backend returned {status}: {error_body}"
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RunnerError::LlmBackend(format!("response parse failed: {e}")))?;
        extract_openai_content(&json)
    }
}

/// Extract text and finish reason from a chat completions response.
fn extract_openai_content(json: &serde_json::Value) -> Result<LlmResponse, RunnerError> {
    let choice = json
        .get("choices")
        .and_then(|c| c.get(0))
        .ok_or_else(|| RunnerError::LlmBackend(String::from("response missing choices[0]")))?;
    let text = choice
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| {
            RunnerError::LlmBackend(String::from("response missing choices[0].message.content"))
        })?;
    let finish_reason = choice
        .get("finish_reason")
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned);
    Ok(LlmResponse {
        text: text.to_owned(),
        finish_reason,
    })
}

// ---------------------------------------------------------------------------
// Anthropic Messages API backend
// ---------------------------------------------------------------------------

/// Backend for the Anthropic Messages API.
///
/// Anthropic differs from the OpenAI shape:
/// - `x-api-key` header instead of `Authorization: Bearer`
/// - the system prompt is a top-level field, not a message
/// - the response text lives at `content[0].text`
/// - truncation is reported as `stop_reason == "max_tokens"`
pub struct AnthropicBackend {
    client: reqwest::Client,
    config: LlmBackendConfig,
}

impl AnthropicBackend {
    /// Create a new Anthropic Messages API backend.
    pub fn new(config: &LlmBackendConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config: config.clone(),
        }
    }

    /// Send a conversation and return the response text.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f64,
    ) -> Result<LlmResponse, RunnerError> {
        let url = format!("{}/messages", self.config.api_url);

        let system: String = messages
            .iter()
            .filter(|m| m.role == "system")
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let turns: Vec<&ChatMessage> = messages.iter().filter(|m| m.role != "system").collect();

        let body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": temperature,
            "system": system,
            "messages": turns,
        });

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| RunnerError::LlmBackend(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unable to read error body"));
            return Err(RunnerError::LlmBackend(format!(
                "backend returned {status}: {error_body}"
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RunnerError::LlmBackend(format!("response parse failed: {e}")))?;
        extract_anthropic_content(&json)
    }
}

/// Extract text and finish reason from a Messages API response.
fn extract_anthropic_content(json: &serde_json::Value) -> Result<LlmResponse, RunnerError> {
    let text = json
        .get("content")
        .and_then(|c| c.get(0))
        .and_then(|b| b.get("text"))
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| RunnerError::LlmBackend(String::from("response missing content[0].text")))?;
    let finish_reason = json
        .get("stop_reason")
        .and_then(serde_json::Value::as_str)
        .map(|reason| {
            if reason == "max_tokens" {
                String::from("length")
            } else {
                reason.to_owned()
            }
        });
    Ok(LlmResponse {
        text: text.to_owned(),
        finish_reason,
    })
}
