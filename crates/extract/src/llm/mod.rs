mod ollama;
pub mod openai;
mod scripted;

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
pub use scripted::ScriptedLlmClient;

use async_trait::async_trait;
use thiserror::Error;

/// A text-in, text-out model backend. Implementations only move bytes; all
/// interpretation of the reply happens in `parse`.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;

    /// Short backend label used in logs and `/health`.
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("request timed out")]
    Timeout,

    #[error("backend not configured: {0}")]
    NotConfigured(String),
}

impl LlmError {
    /// Transient failures worth another attempt. Client errors other than
    /// rate limiting, and missing configuration, will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Request(_) | LlmError::Timeout | LlmError::InvalidResponse(_) => true,
            LlmError::Status { status, .. } => *status == 429 || *status >= 500,
            LlmError::NotConfigured(_) => false,
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else if e.is_decode() {
            LlmError::InvalidResponse(e.to_string())
        } else {
            LlmError::Request(e.to_string())
        }
    }
}

/// First few characters of a prompt, for logs.
pub(crate) fn preview(prompt: &str) -> &str {
    let end = prompt
        .char_indices()
        .nth(80)
        .map(|(i, _)| i)
        .unwrap_or(prompt.len());
    &prompt[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(LlmError::Timeout.is_retryable());
        assert!(LlmError::Status { status: 503, body: String::new() }.is_retryable());
        assert!(LlmError::Status { status: 429, body: String::new() }.is_retryable());
        assert!(!LlmError::Status { status: 401, body: String::new() }.is_retryable());
        assert!(!LlmError::NotConfigured("no key".into()).is_retryable());
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let prompt = "é".repeat(200);
        assert_eq!(preview(&prompt).chars().count(), 80);
        assert_eq!(preview("short"), "short");
    }
}
