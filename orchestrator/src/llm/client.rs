//! LlmClient trait - the out-of-scope external collaborator seam for model calls
//!
//! Grounded on the teacher's `td/src/llm/client.rs`: one trait, one mock, no
//! conversation state carried between calls (each stage call is independent).

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::debug;

use super::{CompletionRequest, CompletionResponse, LlmError};

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Which model name this client speaks to - used by `LLMGateway` to
    /// stamp `CompletionResponse::model_used` and to key the cooldown table.
    fn model_name(&self) -> &str;
}

/// Scripted client for pipeline/unit tests
pub struct MockLlmClient {
    model: String,
    responses: Mutex<Vec<Result<CompletionResponse, LlmError>>>,
    call_count: AtomicUsize,
}

impl MockLlmClient {
    pub fn new(model: impl Into<String>, responses: Vec<Result<CompletionResponse, LlmError>>) -> Self {
        Self {
            model: model.into(),
            responses: Mutex::new(responses),
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!("MockLlmClient::complete: called");
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let mut responses = self.responses.lock().expect("mock responses poisoned");
        if responses.is_empty() {
            return Err(LlmError::ModelUnavailable(self.model.clone()));
        }
        responses.remove(0)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{StopReason, TokenUsage};

    fn ok_response(text: &str) -> Result<CompletionResponse, LlmError> {
        Ok(CompletionResponse {
            content: Some(text.to_string()),
            tool_calls: vec![],
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
            model_used: "mock".to_string(),
        })
    }

    #[tokio::test]
    async fn drains_scripted_responses_in_order() {
        let client = MockLlmClient::new("mock", vec![ok_response("first"), ok_response("second")]);
        let req = CompletionRequest::simple("sys", "hi", 100);
        let r1 = client.complete(req.clone()).await.unwrap();
        let r2 = client.complete(req).await.unwrap();
        assert_eq!(r1.content.as_deref(), Some("first"));
        assert_eq!(r2.content.as_deref(), Some("second"));
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn errors_with_model_unavailable_once_exhausted() {
        let client = MockLlmClient::new("mock", vec![]);
        let err = client.complete(CompletionRequest::simple("sys", "hi", 100)).await.unwrap_err();
        assert!(matches!(err, LlmError::ModelUnavailable(_)));
    }
}
