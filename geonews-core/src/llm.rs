//! LLM completion clients
//!
//! Provides an `LlmBackend` trait with implementations for:
//! - **OpenAI**: chat completions API
//! - **Gemini**: `generateContent` API
//!
//! Both retry with exponential backoff. `create_backend` returns `None` when no
//! provider is configured or its key is missing; callers then use their
//! non-LLM fallbacks (keyword intent analysis, truncated summaries).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;

use crate::config::{LlmConfig, LlmProvider};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

// ============================================================================
// LlmBackend trait
// ============================================================================

/// A single prompt/response exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Abstraction over text-generation providers.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn generate(&self, request: &CompletionRequest) -> Result<String, LlmError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Empty completion in response")]
    EmptyResponse,

    #[error("Missing API key")]
    MissingApiKey,

    #[error("No LLM provider configured")]
    NotConfigured,

    #[error("All {attempts} retry attempts failed: {last}")]
    RetryExhausted { attempts: usize, last: String },
}

// ============================================================================
// Config types
// ============================================================================

#[derive(Debug, Clone)]
pub struct LlmClientConfig {
    pub api_key: String,
    pub model: String,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
    pub timeout: Duration,
}

impl LlmClientConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            max_retries: 2,
            retry_delay_ms: 500,
            timeout: Duration::from_secs(30),
        }
    }

    fn from_settings(api_key: String, model: &str, config: &LlmConfig) -> Self {
        Self {
            api_key,
            model: model.to_string(),
            max_retries: config.max_retries,
            retry_delay_ms: config.retry_delay_ms,
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }
}

/// Build the configured backend. API keys come from `OPENAI_API_KEY` / `GOOGLE_API_KEY`.
///
/// A selected provider without its key yields `Ok(None)` so the service still
/// starts and runs on fallbacks.
pub fn create_backend(config: &LlmConfig) -> Result<Option<Arc<dyn LlmBackend>>, LlmError> {
    let (env_var, model) = match config.provider {
        LlmProvider::None => return Ok(None),
        LlmProvider::OpenAi => ("OPENAI_API_KEY", &config.openai_model),
        LlmProvider::Gemini => ("GOOGLE_API_KEY", &config.gemini_model),
    };

    let key = std::env::var(env_var).unwrap_or_default();
    if key.trim().is_empty() {
        tracing::warn!(env_var, "LLM provider selected but API key is not set; using fallbacks");
        return Ok(None);
    }

    let client_config = LlmClientConfig::from_settings(key, model, config);
    let backend: Arc<dyn LlmBackend> = match config.provider {
        LlmProvider::Gemini => Arc::new(GeminiClient::new(client_config)?),
        _ => Arc::new(OpenAiClient::new(client_config)?),
    };
    tracing::info!(backend = backend.name(), model = %model, "LLM backend ready");
    Ok(Some(backend))
}

fn build_http_client(config: &LlmClientConfig) -> Result<Client, LlmError> {
    if config.api_key.is_empty() {
        return Err(LlmError::MissingApiKey);
    }
    Ok(Client::builder().timeout(config.timeout).build()?)
}

async fn with_retries<F, Fut>(config: &LlmClientConfig, backend: &str, call: F) -> Result<String, LlmError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<String, LlmError>>,
{
    let retry_strategy = ExponentialBackoff::from_millis(config.retry_delay_ms.max(1))
        .max_delay(Duration::from_secs(10))
        .map(jitter)
        .take(config.max_retries);

    match Retry::spawn(retry_strategy, call).await {
        Ok(text) => Ok(text),
        Err(e) => {
            let attempts = config.max_retries + 1;
            tracing::error!(backend, attempts, error = %e, "All LLM retry attempts failed");
            Err(LlmError::RetryExhausted {
                attempts,
                last: e.to_string(),
            })
        }
    }
}

// ============================================================================
// OpenAI API structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
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
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: Option<OpenAiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

// ============================================================================
// OpenAiClient
// ============================================================================

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    config: LlmClientConfig,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(config: LlmClientConfig) -> Result<Self, LlmError> {
        Self::with_base_url(config, OPENAI_BASE_URL.to_string())
    }

    /// Create a client with a custom base URL (for testing / proxies)
    pub fn with_base_url(config: LlmClientConfig, base_url: String) -> Result<Self, LlmError> {
        let client = build_http_client(&config)?;
        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    async fn generate_once(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        let body = ChatRequest {
            model: &self.config.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OpenAiErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.error)
                .map(|e| e.message)
                .unwrap_or(error_body);

            tracing::warn!(code = status.as_u16(), message = %message, "OpenAI API error");
            return Err(LlmError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}

#[async_trait]
impl LlmBackend for OpenAiClient {
    async fn generate(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        with_retries(&self.config, self.name(), || self.generate_once(request)).await
    }

    fn name(&self) -> &str {
        "openai"
    }
}

// ============================================================================
// Gemini API structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent<'a>>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    code: u16,
    message: String,
}

// ============================================================================
// GeminiClient
// ============================================================================

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    config: LlmClientConfig,
    base_url: String,
}

impl GeminiClient {
    pub fn new(config: LlmClientConfig) -> Result<Self, LlmError> {
        Self::with_base_url(config, GEMINI_BASE_URL.to_string())
    }

    /// Create a client with a custom base URL (for testing / proxies)
    pub fn with_base_url(config: LlmClientConfig, base_url: String) -> Result<Self, LlmError> {
        let client = build_http_client(&config)?;
        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    async fn generate_once(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.config.model, self.config.api_key
        );

        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user"),
                parts: vec![GeminiPart {
                    text: &request.prompt,
                }],
            }],
            system_instruction: request.system.as_deref().map(|text| GeminiContent {
                role: None,
                parts: vec![GeminiPart { text }],
            }),
            generation_config: GeminiGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        };

        let response = self.client.post(&url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let (code, message) = serde_json::from_str::<GeminiErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.error)
                .map(|e| (e.code, e.message))
                .unwrap_or((status.as_u16(), error_body));

            tracing::warn!(code = code, message = %message, "Gemini API error");
            return Err(LlmError::Api { code, message });
        }

        let parsed: GeminiResponse = response.json().await?;
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl LlmBackend for GeminiClient {
    async fn generate(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        with_retries(&self.config, self.name(), || self.generate_once(request)).await
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

// ============================================================================
// TESTS
// ============================================================================
