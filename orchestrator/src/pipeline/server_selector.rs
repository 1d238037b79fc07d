//! ServerSelector - Stage 2.0 (`spec.md` 4.7)

use crate::domain::{ServerSelection, TodoItem};
use crate::llm::{GatewayRequest, LLMGateway};
use crate::parser;
use crate::prompts::PromptStore;
use crate::stage::{StageErrorKind, StageOutcome};

pub struct ServerSelector;

impl ServerSelector {
    pub async fn select(item: &TodoItem, known_servers: &[String], gateway: &LLMGateway, prompts: &PromptStore) -> StageOutcome<ServerSelection> {
        // Rule 1: adopt the planner's own selection verbatim if non-empty and known.
        if !item.mcp_servers.is_empty() && item.mcp_servers.iter().all(|s| known_servers.contains(s)) {
            return StageOutcome::Ok(ServerSelection::adopted(item.mcp_servers.clone(), 0.95));
        }

        // Rule 2: ask LLMGateway.
        let Ok(resolved) = prompts.resolve(
            "server_selector",
            &serde_json::json!({ "action": item.action, "success_criteria": item.success_criteria, "known_servers": known_servers }),
        ) else {
            return StageOutcome::Fail(StageErrorKind::SchemaValidation, "server_selector prompt missing".into());
        };

        let request = GatewayRequest { system: resolved.system, user: resolved.user, temperature: 0.1, max_tokens: 512, json_object: true };

        let response = match gateway.call(request).await {
            Ok(response) => response,
            Err(err) => return StageOutcome::Fail(StageErrorKind::ModelUnavailable, format!("gateway call failed: {err}")),
        };

        let parsed = parser::parse(&response.text);
        let servers: Vec<String> = parsed
            .value
            .get("selected_servers")
            .and_then(|v| v.as_array())
            .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default();
        let reasoning = parsed.value.get("reasoning").and_then(|v| v.as_str()).unwrap_or("").to_string();
        let confidence = parsed.value.get("confidence").and_then(|v| v.as_f64()).unwrap_or(0.5) as f32;

        if servers.is_empty() {
            return StageOutcome::Fail(StageErrorKind::ParseFailure, "no servers selected".into());
        }

        // `spec.md` 4.7 rule 2: >2 servers emits needs_split with a suggested
        // binary partition, never a silent trim.
        let selection = if servers.len() > 2 {
            let midpoint = servers.len() / 2;
            let (left, right) = servers.split_at(midpoint);
            ServerSelection::split((left.to_vec(), right.to_vec()), format!("LLM proposed {} servers: {reasoning}", servers.len()))
        } else {
            ServerSelection { selected_servers: servers.clone(), selected_prompts: servers.iter().map(|s| crate::domain::prompt_name_for(s)).collect(), reasoning, confidence, needs_split: false, suggested_partition: None }
        };

        if parsed.fallback_parsed {
            StageOutcome::Fallback(selection, "parser fell back while selecting servers".into())
        } else {
            StageOutcome::Ok(selection)
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
    async fn adopts_planner_selection_verbatim_when_all_known() {
        let client = MockLlmClient::new("mock", vec![]);
        let gateway = LLMGateway::new(Box::new(client), None);
        let prompts = PromptStore::new();
        let mut item = TodoItem::new("a", "create folder", "folder exists", 3);
        item.mcp_servers = vec!["filesystem".to_string()];
        let known = vec!["filesystem".to_string()];
        let outcome = ServerSelector::select(&item, &known, &gateway, &prompts).await;
        match outcome {
            StageOutcome::Ok(selection) => {
                assert_eq!(selection.confidence, 0.95);
                assert_eq!(selection.selected_servers, vec!["filesystem".to_string()]);
            }
            _ => panic!("expected Ok outcome"),
        }
    }

    #[tokio::test]
    async fn asks_gateway_when_planner_selection_is_empty() {
        let client = MockLlmClient::new("mock", vec![ok_text(r#"{"selected_servers": ["shell"], "reasoning": "needs shell", "confidence": 0.8}"#)]);
        let gateway = LLMGateway::new(Box::new(client), None);
        let prompts = PromptStore::new();
        let item = TodoItem::new("a", "run build script", "build succeeds", 3);
        let known = vec!["filesystem".to_string(), "shell".to_string()];
        let outcome = ServerSelector::select(&item, &known, &gateway, &prompts).await;
        match outcome {
            StageOutcome::Ok(selection) => assert_eq!(selection.selected_servers, vec!["shell".to_string()]),
            _ => panic!("expected Ok outcome"),
        }
    }

    #[tokio::test]
    async fn more_than_two_servers_signals_needs_split_with_partition() {
        let client = MockLlmClient::new(
            "mock",
            vec![ok_text(r#"{"selected_servers": ["filesystem", "shell", "browser"], "reasoning": "complex task", "confidence": 0.7}"#)],
        );
        let gateway = LLMGateway::new(Box::new(client), None);
        let prompts = PromptStore::new();
        let item = TodoItem::new("a", "do everything", "everything done", 3);
        let known = vec!["filesystem".to_string(), "shell".to_string(), "browser".to_string()];
        let outcome = ServerSelector::select(&item, &known, &gateway, &prompts).await;
        match outcome {
            StageOutcome::Ok(selection) => {
                assert!(selection.needs_split);
                assert!(selection.suggested_partition.is_some());
            }
            _ => panic!("expected Ok outcome"),
        }
    }
}
