//! Language model backend abstraction
//!
//! The matching pipeline only needs single-shot text completion: a prompt in,
//! free-form text out. Backends:
//! - OpenAI-compatible HTTP APIs (OpenAI, vLLM, Ollama, ...)
//! - a scripted mock for tests

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod mock;
pub mod openai;

pub use mock::MockBackend;
pub use openai::OpenAiBackend;

/// Error types for model calls.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    /// Provider answered with a non-success status
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Rate limited by the provider
    #[error("Rate limited by provider")]
    RateLimited,

    /// Transport failure, including timeouts
    #[error("Network error: {0}")]
    Network(String),

    /// Provider response envelope could not be decoded
    #[error("Unexpected provider response: {0}")]
    InvalidResponse(String),

    /// Client construction failed
    #[error("Backend configuration error: {0}")]
    Configuration(String),
}

/// Single-prompt completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: 0.3,
            max_tokens: 4000,
        }
    }

    /// Set temperature, clamped to the range providers accept.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Core trait for model backends.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Backend identifier, usually the model name.
    fn id(&self) -> &str;

    /// Generate a completion and return the raw response text.
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_is_clamped() {
        let request = CompletionRequest::new("hi").with_temperature(5.0);
        assert_eq!(request.temperature, 2.0);

        let request = CompletionRequest::new("hi").with_temperature(-1.0);
        assert_eq!(request.temperature, 0.0);
    }
}
