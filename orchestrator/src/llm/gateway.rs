//! LLMGateway - single call surface with retry, rate-limit handling, and fallback
//!
//! Grounded on the teacher's retry idiom in `td/src/tools/executor.rs`
//! (attempt loop with capped exponential backoff), generalized to the
//! model-level retry/fallback rules this pipeline needs (`spec.md` 4.1).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError};

const BASE_BACKOFF: Duration = Duration::from_secs(10);
const MAX_BACKOFF: Duration = Duration::from_secs(60);
const MAX_MODEL_ATTEMPTS: u32 = 3;

/// One LLM call as the pipeline sees it, independent of wire-format detail
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub json_object: bool,
}

#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub text: String,
    pub model_used: String,
    pub usage: super::TokenUsage,
}

/// Aggregate counters exposed for the CLI's session-metrics view, grounded
/// on the teacher's `state/manager.rs::DaemonMetrics`. Updated atomically
/// alongside the cooldown table under the same lock discipline.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct GatewayMetrics {
    pub calls: u64,
    pub retries: u64,
    pub fallback_calls: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Shared, process-wide call surface. `LLMGateway` holds no per-session
/// state (`spec.md` 3: "LLMGateway and MCPRegistry are shared by all
/// sessions"); the cooldown table below is the one piece of mutable state
/// it does own, and it is updated atomically under a single mutex.
pub struct LLMGateway {
    primary: Box<dyn LlmClient>,
    fallback: Option<Box<dyn LlmClient>>,
    cooldowns: Mutex<HashMap<String, Instant>>,
    metrics: Mutex<GatewayMetrics>,
}

impl LLMGateway {
    pub fn new(primary: Box<dyn LlmClient>, fallback: Option<Box<dyn LlmClient>>) -> Self {
        Self { primary, fallback, cooldowns: Mutex::new(HashMap::new()), metrics: Mutex::new(GatewayMetrics::default()) }
    }

    pub fn metrics(&self) -> GatewayMetrics {
        *self.metrics.lock().expect("metrics table poisoned")
    }

    fn in_cooldown(&self, model: &str) -> Option<Duration> {
        let cooldowns = self.cooldowns.lock().expect("cooldown table poisoned");
        cooldowns.get(model).and_then(|until| until.checked_duration_since(Instant::now()))
    }

    fn set_cooldown(&self, model: &str, for_duration: Duration) {
        let mut cooldowns = self.cooldowns.lock().expect("cooldown table poisoned");
        cooldowns.insert(model.to_string(), Instant::now() + for_duration);
    }

    /// `spec.md` 4.1: up to 3 total model attempts across primary+fallback per call
    pub async fn call(&self, request: GatewayRequest) -> Result<GatewayResponse, LlmError> {
        let completion_request = CompletionRequest {
            system_prompt: request.system,
            messages: vec![super::Message::user(request.user)],
            tools: Vec::new(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            json_object: request.json_object,
        };

        self.metrics.lock().expect("metrics table poisoned").calls += 1;

        let mut attempts_left = MAX_MODEL_ATTEMPTS;
        let mut last_err = None;

        if let Some(response) = self.try_client(self.primary.as_ref(), &completion_request, &mut attempts_left, &mut last_err).await {
            return Ok(response);
        }

        if let Some(fallback) = &self.fallback {
            if attempts_left > 0 {
                warn!(model = %self.primary.model_name(), "LLMGateway::call: primary exhausted, switching to fallback");
                self.metrics.lock().expect("metrics table poisoned").fallback_calls += 1;
                if let Some(response) = self.try_client(fallback.as_ref(), &completion_request, &mut attempts_left, &mut last_err).await {
                    return Ok(response);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| LlmError::ModelUnavailable(self.primary.model_name().to_string())))
    }

    async fn try_client(
        &self,
        client: &dyn LlmClient,
        request: &CompletionRequest,
        attempts_left: &mut u32,
        last_err: &mut Option<LlmError>,
    ) -> Option<GatewayResponse> {
        let model = client.model_name().to_string();

        if let Some(remaining) = self.in_cooldown(&model) {
            debug!(%model, cooldown_ms = %remaining.as_millis(), "LLMGateway::try_client: model in cooldown, skipping");
            *last_err = Some(LlmError::RateLimited { retry_after: Some(remaining) });
            return None;
        }

        let mut backoff = BASE_BACKOFF;
        let mut first_attempt = true;
        while *attempts_left > 0 {
            *attempts_left -= 1;
            if !first_attempt {
                self.metrics.lock().expect("metrics table poisoned").retries += 1;
            }
            first_attempt = false;
            match client.complete(request.clone()).await {
                Ok(response) => {
                    let usage = response.usage;
                    {
                        let mut metrics = self.metrics.lock().expect("metrics table poisoned");
                        metrics.input_tokens += usage.input_tokens as u64;
                        metrics.output_tokens += usage.output_tokens as u64;
                    }
                    return response.content.map(|text| GatewayResponse { text, model_used: response.model_used, usage });
                }
                Err(err) => {
                    debug!(%model, error = %err, "LLMGateway::try_client: call failed");
                    if err.is_rate_limit() {
                        let delay = err.retry_after().unwrap_or(backoff);
                        self.set_cooldown(&model, delay);
                    }
                    let retryable = err.is_retryable();
                    last_err.replace(err);
                    if !retryable || *attempts_left == 0 {
                        break;
                    }
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::MockLlmClient;
    use crate::llm::{StopReason, TokenUsage};

    fn ok(text: &str, model: &str) -> Result<CompletionResponse, LlmError> {
        Ok(CompletionResponse {
            content: Some(text.to_string()),
            tool_calls: vec![],
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
            model_used: model.to_string(),
        })
    }

    fn request() -> GatewayRequest {
        GatewayRequest { system: "sys".into(), user: "hi".into(), temperature: 0.0, max_tokens: 100, json_object: false }
    }

    #[tokio::test]
    async fn returns_text_and_model_on_first_success() {
        let primary = MockLlmClient::new("primary", vec![ok("hello", "primary")]);
        let gateway = LLMGateway::new(Box::new(primary), None);
        let response = gateway.call(request()).await.unwrap();
        assert_eq!(response.text, "hello");
        assert_eq!(response.model_used, "primary");
    }

    #[tokio::test]
    async fn falls_back_after_persistent_non_retryable_primary_failure() {
        let primary = MockLlmClient::new("primary", vec![Err(LlmError::ModelUnavailable("primary".into()))]);
        let fallback = MockLlmClient::new("fallback", vec![ok("from fallback", "fallback")]);
        let gateway = LLMGateway::new(Box::new(primary), Some(Box::new(fallback)));
        let response = gateway.call(request()).await.unwrap();
        assert_eq!(response.model_used, "fallback");
    }

    #[tokio::test]
    async fn fails_with_last_error_when_no_fallback_configured() {
        let primary = MockLlmClient::new("primary", vec![Err(LlmError::BadResponse("malformed".into()))]);
        let gateway = LLMGateway::new(Box::new(primary), None);
        let err = gateway.call(request()).await.unwrap_err();
        assert!(matches!(err, LlmError::BadResponse(_)));
    }

    #[tokio::test]
    async fn metrics_count_calls_and_fallback_usage() {
        let primary = MockLlmClient::new("primary", vec![Err(LlmError::ModelUnavailable("primary".into()))]);
        let fallback = MockLlmClient::new("fallback", vec![ok("from fallback", "fallback")]);
        let gateway = LLMGateway::new(Box::new(primary), Some(Box::new(fallback)));
        gateway.call(request()).await.unwrap();

        let metrics = gateway.metrics();
        assert_eq!(metrics.calls, 1);
        assert_eq!(metrics.fallback_calls, 1);
    }
}
