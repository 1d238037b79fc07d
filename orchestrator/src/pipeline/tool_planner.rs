//! ToolPlanner - Stage 2.1 (`spec.md` 4.8)

use crate::domain::{ServerSelection, ToolCall, ToolPlan};
use crate::llm::{GatewayRequest, LLMGateway};
use crate::parser;
use crate::prompts::PromptStore;
use crate::stage::{StageErrorKind, StageOutcome};

pub struct ToolPlanner;

impl ToolPlanner {
    pub async fn plan(action: &str, selection: &ServerSelection, available_tools: &str, gateway: &LLMGateway, prompts: &PromptStore) -> StageOutcome<ToolPlan> {
        let Ok(resolved) = prompts.resolve(
            "tool_planner",
            &serde_json::json!({ "action": action, "selected_servers": selection.selected_servers, "available_tools": available_tools }),
        ) else {
            return StageOutcome::Fail(StageErrorKind::SchemaValidation, "tool_planner prompt missing".into());
        };

        let request = GatewayRequest { system: resolved.system, user: resolved.user, temperature: 0.2, max_tokens: 1024, json_object: true };

        let response = match gateway.call(request).await {
            Ok(response) => response,
            Err(err) => return StageOutcome::Fail(StageErrorKind::ModelUnavailable, format!("gateway call failed: {err}")),
        };

        let parsed = parser::parse(&response.text);
        let Some(raw_calls) = parsed.value.get("calls").and_then(|v| v.as_array()) else {
            return StageOutcome::Fail(StageErrorKind::ParseFailure, "no calls array in response".into());
        };

        let mut calls = Vec::new();
        for raw in raw_calls {
            let Some(server) = raw.get("server").and_then(|v| v.as_str()) else { continue };
            let Some(tool) = raw.get("tool").and_then(|v| v.as_str()) else { continue };
            if !selection.selected_servers.contains(&server.to_string()) {
                continue;
            }
            let bare_tool = tool.split_once("__").map(|(_, t)| t).unwrap_or(tool);
            let parameters = raw.get("parameters").cloned().unwrap_or(serde_json::Value::Null);
            let mut call = ToolCall::new(server, bare_tool, parameters);
            if raw.get("is_long_running").and_then(|v| v.as_bool()).unwrap_or(false) {
                call = call.long_running();
            }
            calls.push(call);
        }

        let plan = ToolPlan { calls };
        if plan.is_empty_plan() {
            return StageOutcome::Fail(StageErrorKind::ToolExecution, "plan has zero valid calls".into());
        }

        if parsed.fallback_parsed {
            StageOutcome::Fallback(plan, "parser fell back while planning tools".into())
        } else {
            StageOutcome::Ok(plan)
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
    async fn builds_qualified_calls_for_selected_servers() {
        let client = MockLlmClient::new(
            "mock",
            vec![ok_text(r#"{"calls": [{"server": "filesystem", "tool": "create_directory", "parameters": {"path": "/tmp/demo"}}]}"#)],
        );
        let gateway = LLMGateway::new(Box::new(client), None);
        let prompts = PromptStore::new();
        let selection = ServerSelection::adopted(vec!["filesystem".to_string()], 0.95);
        let outcome = ToolPlanner::plan("create folder /tmp/demo", &selection, "create_directory", &gateway, &prompts).await;
        match outcome {
            StageOutcome::Ok(plan) => {
                assert_eq!(plan.calls.len(), 1);
                assert_eq!(plan.calls[0].tool, "filesystem__create_directory");
            }
            _ => panic!("expected Ok outcome"),
        }
    }

    #[tokio::test]
    async fn drops_calls_to_unselected_servers() {
        let client = MockLlmClient::new(
            "mock",
            vec![ok_text(r#"{"calls": [{"server": "shell", "tool": "run", "parameters": {}}, {"server": "filesystem", "tool": "create_directory", "parameters": {}}]}"#)],
        );
        let gateway = LLMGateway::new(Box::new(client), None);
        let prompts = PromptStore::new();
        let selection = ServerSelection::adopted(vec!["filesystem".to_string()], 0.95);
        let outcome = ToolPlanner::plan("create folder", &selection, "create_directory", &gateway, &prompts).await;
        match outcome {
            StageOutcome::Ok(plan) => {
                assert_eq!(plan.calls.len(), 1);
                assert_eq!(plan.calls[0].server, "filesystem");
            }
            _ => panic!("expected Ok outcome"),
        }
    }

    #[tokio::test]
    async fn empty_plan_is_a_stage_failure() {
        let client = MockLlmClient::new("mock", vec![ok_text(r#"{"calls": []}"#)]);
        let gateway = LLMGateway::new(Box::new(client), None);
        let prompts = PromptStore::new();
        let selection = ServerSelection::adopted(vec!["filesystem".to_string()], 0.95);
        let outcome = ToolPlanner::plan("do nothing", &selection, "", &gateway, &prompts).await;
        assert!(matches!(outcome, StageOutcome::Fail(StageErrorKind::ToolExecution, _)));
    }
}
