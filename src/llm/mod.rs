//! Text completion backends

pub mod gemini;
pub mod ollama;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::config::LlmConfig;

pub use gemini::GeminiCompletion;
pub use ollama::OllamaCompletion;

/// Default local Ollama address
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Errors raised by a completion call
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("completion timed out after {0:?}")]
    Timeout(Duration),

    #[error("completion backend not configured: {0}")]
    NotConfigured(String),
}

/// Sampling options passed with every prompt
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 4096,
        }
    }
}

impl From<&LlmConfig> for CompletionOptions {
    fn from(config: &LlmConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// Submit a prompt, receive generated text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextCompletion: Send + Sync {
    /// Backend tag used in logs
    fn name(&self) -> &str;

    /// Generate text. Blank output is reported as `EmptyResponse`.
    async fn complete(
        &self,
        prompt: &str,
        options: CompletionOptions,
    ) -> Result<String, CompletionError>;
}

/// Builds the configured completion backend
pub fn create_completion(config: &LlmConfig) -> Result<Box<dyn TextCompletion>, CompletionError> {
    let timeout = Duration::from_secs(config.timeout_secs);
    match config.backend.as_str() {
        "ollama" => {
            let base_url = if config.base_url.contains("googleapis.com") {
                DEFAULT_OLLAMA_URL
            } else {
                config.base_url.as_str()
            };
            Ok(Box::new(OllamaCompletion::new(
                base_url,
                &config.model,
                timeout,
            )?))
        }
        "gemini" => {
            let api_key = config
                .api_key
                .as_deref()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| CompletionError::NotConfigured("gemini API key missing".into()))?;
            Ok(Box::new(GeminiCompletion::new(
                &config.base_url,
                &config.model,
                api_key,
                timeout,
            )?))
        }
        other => Err(CompletionError::NotConfigured(format!(
            "unknown completion backend: {other}"
        ))),
    }
}
