//! LLM call surface: wire types, errors, the `LlmClient` seam, and the
//! retrying `LLMGateway` built on top of it.

mod client;
mod error;
mod gateway;
mod http;
mod model_registry;
mod types;

pub use client::{LlmClient, MockLlmClient};
pub use error::LlmError;
pub use gateway::{GatewayMetrics, GatewayRequest, GatewayResponse, LLMGateway};
pub use http::AnthropicClient;
pub use model_registry::{ModelRegistry, StageModelConfig};
pub use types::{
    CompletionRequest, CompletionResponse, ContentBlock, Message, MessageContent, Role, StopReason, StreamChunk, TokenUsage, ToolCall, ToolDefinition,
};

use tracing::debug;

/// Generates a short 3-5 word hyphenated title for a TodoPlan or session,
/// used to label entries in logs and summaries. Non-critical path: a
/// failed call just means no title, never a pipeline failure.
pub async fn name_markdown(gateway: &LLMGateway, text: &str) -> Option<String> {
    debug!(text_len = text.len(), "name_markdown: called");

    let request = GatewayRequest {
        system: "Generate a 3-5 word title for this content. Output ONLY the title, nothing else. \
                 Use lowercase words separated by hyphens. Example: oauth-database-schema"
            .to_string(),
        user: text.to_string(),
        temperature: 0.0,
        max_tokens: 50,
        json_object: false,
    };

    match gateway.call(request).await {
        Ok(response) => {
            let title: String = response.text.trim().to_lowercase().replace(' ', "-").chars().filter(|c| c.is_alphanumeric() || *c == '-').collect();
            debug!(%title, "name_markdown: generated");
            if title.is_empty() {
                None
            } else {
                Some(title)
            }
        }
        Err(err) => {
            debug!(%err, "name_markdown: gateway call failed");
            None
        }
    }
}
