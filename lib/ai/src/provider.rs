//! Language-model provider abstraction.
//!
//! The workflow engine never talks to a model API directly; it hands a
//! fully-resolved [`LlmRequest`] to whatever [`LlmProvider`] it was
//! constructed with and consumes the `{text, usage}` response.

use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single-shot inference request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    /// The fully-resolved prompt text.
    pub prompt: String,
    /// Model identifier understood by the provider.
    pub model: String,
    /// Temperature for sampling.
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
}

impl LlmRequest {
    /// Creates a new request for the given prompt and model.
    #[must_use]
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Sets the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the max tokens.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Token usage statistics for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of input tokens.
    pub input_tokens: u32,
    /// Number of output tokens.
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Returns the total number of tokens.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// A response from a language model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// The generated text.
    pub text: String,
    /// Token usage statistics.
    pub usage: TokenUsage,
    /// Model that generated the response.
    pub model: String,
}

/// Trait for language-model providers.
///
/// Implementations wrap a concrete model API; failures surface as
/// [`LlmError`] and become node-level failures in the workflow engine.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Runs a single inference and returns the generated text with usage.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider call fails.
    async fn invoke(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;
}

/// A provider that echoes the prompt back as the generated text.
///
/// Useful in tests that need to observe the exact prompt a node produced
/// after template resolution.
pub struct EchoProvider;

#[async_trait]
impl LlmProvider for EchoProvider {
    async fn invoke(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        Ok(LlmResponse {
            text: request.prompt.clone(),
            usage: TokenUsage::default(),
            model: request.model.clone(),
        })
    }
}

/// A provider that can be configured to succeed with fixed text or fail.
pub struct ScriptedProvider {
    /// If set, all invocations fail with this error.
    pub fail_with: Option<LlmError>,
    /// The text to return on success.
    pub text: String,
    /// The usage to report on success.
    pub usage: TokenUsage,
}

impl ScriptedProvider {
    /// Creates a provider that succeeds with the given text.
    #[must_use]
    pub fn succeeding(text: impl Into<String>) -> Self {
        Self {
            fail_with: None,
            text: text.into(),
            usage: TokenUsage::default(),
        }
    }

    /// Creates a provider that fails with the given error.
    #[must_use]
    pub fn failing(error: LlmError) -> Self {
        Self {
            fail_with: Some(error),
            text: String::new(),
            usage: TokenUsage::default(),
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn invoke(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        match &self.fail_with {
            Some(e) => Err(e.clone()),
            None => Ok(LlmResponse {
                text: self.text.clone(),
                usage: self.usage.clone(),
                model: request.model.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder() {
        let request = LlmRequest::new("Summarize this", "small-model")
            .with_temperature(0.3)
            .with_max_tokens(256);

        assert_eq!(request.prompt, "Summarize this");
        assert_eq!(request.model, "small-model");
        assert_eq!(request.temperature, Some(0.3));
        assert_eq!(request.max_tokens, Some(256));
    }

    #[test]
    fn token_usage_total() {
        let usage = TokenUsage {
            input_tokens: 100,
            output_tokens: 50,
        };
        assert_eq!(usage.total(), 150);
    }

    #[tokio::test]
    async fn echo_provider_returns_prompt() {
        let provider = EchoProvider;
        let request = LlmRequest::new("hello", "any-model");

        let response = provider.invoke(&request).await.expect("invoke");
        assert_eq!(response.text, "hello");
        assert_eq!(response.model, "any-model");
    }

    #[tokio::test]
    async fn scripted_provider_fails_on_demand() {
        let provider = ScriptedProvider::failing(LlmError::RateLimited);
        let request = LlmRequest::new("hello", "any-model");

        let result = provider.invoke(&request).await;
        assert_eq!(result.unwrap_err(), LlmError::RateLimited);
    }

    #[test]
    fn request_serde_roundtrip() {
        let request = LlmRequest::new("prompt", "model").with_temperature(0.7);
        let json = serde_json::to_string(&request).expect("serialize");
        let parsed: LlmRequest = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.prompt, "prompt");
        assert_eq!(parsed.temperature, Some(0.7));
    }
}
