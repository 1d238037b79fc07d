//! ChatResponder - the chat-mode reply path (`spec.md` 2: "if chat, a
//! single LLM reply")

use crate::llm::{GatewayRequest, LLMGateway};
use crate::parser;
use crate::prompts::PromptStore;
use crate::stage::StageOutcome;

pub struct ChatResponder;

impl ChatResponder {
    pub async fn reply(gateway: &LLMGateway, prompts: &PromptStore, utterance: &str, recent_turns: &str) -> StageOutcome<String> {
        let fallback_reply = "Sorry, I'm having trouble responding right now.".to_string();

        let Ok(resolved) = prompts.resolve("chat_reply", &serde_json::json!({ "utterance": utterance, "recent_turns": recent_turns })) else {
            return StageOutcome::Fallback(fallback_reply, "chat_reply prompt missing".into());
        };

        let request = GatewayRequest { system: resolved.system, user: resolved.user, temperature: 0.7, max_tokens: 512, json_object: true };

        let response = match gateway.call(request).await {
            Ok(response) => response,
            Err(err) => return StageOutcome::Fallback(fallback_reply, format!("gateway call failed: {err}")),
        };

        let parsed = parser::parse(&response.text);
        let Some(reply) = parsed.value.get("reply").and_then(|v| v.as_str()).map(String::from) else {
            return StageOutcome::Fallback(fallback_reply, "no reply field in response".into());
        };

        if parsed.fallback_parsed {
            StageOutcome::Fallback(reply, "parser fell back while generating chat reply".into())
        } else {
            StageOutcome::Ok(reply)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    fn ok_text(text: &str) -> Result<crate::llm::CompletionResponse, crate::llm::LlmError> {
        Ok(crate::llm::CompletionResponse {
            content: Some(text.to_string()),
            tool_calls: vec![],
            stop_reason: crate::llm::StopReason::EndTurn,
            usage: crate::llm::TokenUsage::default(),
            model_used: "mock".to_string(),
        })
    }

    #[tokio::test]
    async fn returns_reply_text_from_response() {
        let client = MockLlmClient::new("mock", vec![ok_text(r#"{"reply": "Привіт! Чим можу допомогти?"}"#)]);
        let gateway = LLMGateway::new(Box::new(client), None);
        let prompts = PromptStore::new();
        let outcome = ChatResponder::reply(&gateway, &prompts, "Привіт", "").await;
        match outcome {
            StageOutcome::Ok(reply) => assert!(reply.contains("Привіт")),
            _ => panic!("expected Ok outcome"),
        }
    }

    #[tokio::test]
    async fn gateway_failure_falls_back_to_a_generic_reply() {
        let client = MockLlmClient::new("mock", vec![]);
        let gateway = LLMGateway::new(Box::new(client), None);
        let prompts = PromptStore::new();
        let outcome = ChatResponder::reply(&gateway, &prompts, "hello", "").await;
        match outcome {
            StageOutcome::Fallback(reply, _) => assert!(!reply.is_empty()),
            _ => panic!("expected Fallback outcome"),
        }
    }
}
