//! LLM-facing error kinds
//!
//! Adapted from the teacher's `llm/error.rs`, renamed onto the error
//! vocabulary the pipeline's error handling design names for LLM calls:
//! `RateLimited`, `Timeout`, `Transport`, `ModelUnavailable`, `BadResponse`.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("rate limited{}", .retry_after.map(|d| format!(", retry after {d:?}")).unwrap_or_default())]
    RateLimited { retry_after: Option<Duration> },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("model '{0}' unavailable")]
    ModelUnavailable(String),

    #[error("bad response: {0}")]
    BadResponse(String),
}

impl LlmError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, LlmError::RateLimited { .. })
    }

    /// Whether `LLMGateway` should retry the same model on this error
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::RateLimited { .. } | LlmError::Timeout(_) | LlmError::Transport(_))
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            LlmError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout(Duration::from_secs(0))
        } else {
            LlmError::Transport(err.to_string())
        }
    }
}
