//! Replanner - Stage 3.6 (`spec.md` 4.12)

use crate::domain::{TodoItem, Verification};
use crate::llm::{GatewayRequest, LLMGateway};
use crate::parser;
use crate::pipeline::verifier::RootCause;
use crate::prompts::PromptStore;
use crate::stage::{StageErrorKind, StageOutcome};

/// `spec.md` 4.12: the recommended strategy a root cause maps to, handed
/// to the LLM alongside the failing item and its verification
fn strategy_for(root_cause: RootCause) -> &'static str {
    match root_cause {
        RootCause::MissingPrerequisite => "insert a prerequisite step before retrying the original action",
        RootCause::PermissionIssue => "swap tools or adjust parameters to run with the required permissions",
        RootCause::WrongParameters => "adjust the parameters passed to the existing tool calls",
        RootCause::ToolExecutionFailed => "swap to an alternate tool that accomplishes the same action",
        RootCause::TimingIssue => "retry unchanged; no replan needed beyond the normal retry budget",
        RootCause::WrongApproach => "split the item into smaller steps that reach the same success criteria differently",
        RootCause::UnrealisticCriteria => "relax the success criteria to something the available tools can actually verify",
        RootCause::UnclearState => "insert a diagnostic step before deciding how to proceed",
        RootCause::VisionModelFailure => "fall back to a data-path (MCP) success check instead of visual verification",
        RootCause::ExecutionErrorVisible => "split the item so the step that raised the error is isolated and retried alone",
        RootCause::ToolsSucceededButWrongResult => "relax or re-target the success criteria; the tools ran but produced the wrong outcome",
    }
}

pub struct Replanner;

impl Replanner {
    /// `spec.md` 4.12: "emits zero or more replacement items...replacement
    /// items re-enter Stage 2.0."
    pub async fn replan(item: &TodoItem, verification: &Verification, root_cause: RootCause, gateway: &LLMGateway, prompts: &PromptStore) -> StageOutcome<Vec<TodoItem>> {
        let strategy = strategy_for(root_cause);
        let Ok(resolved) = prompts.resolve(
            "replanner",
            &serde_json::json!({
                "action": item.action,
                "success_criteria": item.success_criteria,
                "verification_reason": verification.reason,
                "strategy": strategy,
            }),
        ) else {
            return StageOutcome::Fail(StageErrorKind::SchemaValidation, "replanner prompt missing".into());
        };

        let request = GatewayRequest { system: resolved.system, user: resolved.user, temperature: 0.3, max_tokens: 1024, json_object: true };

        let response = match gateway.call(request).await {
            Ok(response) => response,
            Err(err) => return StageOutcome::Fail(StageErrorKind::ModelUnavailable, format!("gateway call failed: {err}")),
        };

        let parsed = parser::parse(&response.text);
        let Some(raw_items) = parsed.value.get("items").and_then(|v| v.as_array()) else {
            return StageOutcome::Fail(StageErrorKind::ParseFailure, "no items array in replan response".into());
        };

        let items: Vec<TodoItem> = raw_items.iter().enumerate().map(|(index, raw)| Self::build_item(raw, item, index)).collect();

        if parsed.fallback_parsed {
            StageOutcome::Fallback(items, "parser fell back while replanning".into())
        } else {
            StageOutcome::Ok(items)
        }
    }

    fn build_item(raw: &serde_json::Value, parent: &TodoItem, index: usize) -> TodoItem {
        let action = raw.get("action").and_then(|v| v.as_str()).unwrap_or(&parent.action).to_string();
        let success_criteria = raw.get("success_criteria").and_then(|v| v.as_str()).unwrap_or(&parent.success_criteria).to_string();
        let mut new_item = TodoItem::new(crate::domain::IdAllocator::child_id(&parent.id, index), action, success_criteria, parent.max_attempts);
        if let Some(servers) = raw.get("suggested_servers").and_then(|v| v.as_array()) {
            for server in servers.iter().filter_map(|v| v.as_str()) {
                new_item.suggested_servers.insert(server.to_string());
            }
        }
        new_item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::VerificationMethod;
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

    fn failing_verification() -> Verification {
        Verification {
            verified: false,
            confidence: 30,
            reason: "target folder was not found".to_string(),
            method: VerificationMethod::Mcp,
            visual_evidence: None,
            screenshot_path: None,
            vision_model: None,
            mcp_results: None,
            tts_phrase: String::new(),
            fallback_detected: false,
            security_checks_passed: true,
        }
    }

    #[tokio::test]
    async fn emits_child_items_with_hierarchical_ids() {
        let client = MockLlmClient::new(
            "mock",
            vec![ok_text(
                r#"{"items": [{"action": "create parent directory first", "success_criteria": "parent exists", "suggested_servers": ["filesystem"]}]}"#,
            )],
        );
        let gateway = LLMGateway::new(Box::new(client), None);
        let prompts = PromptStore::new();
        let item = TodoItem::new("b", "create folder /tmp/demo/sub", "folder exists", 3);
        let outcome = Replanner::replan(&item, &failing_verification(), RootCause::MissingPrerequisite, &gateway, &prompts).await;
        match outcome {
            StageOutcome::Ok(items) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].id, "b.1");
            }
            _ => panic!("expected Ok outcome"),
        }
    }

    #[tokio::test]
    async fn empty_items_abandons_rather_than_fails() {
        let client = MockLlmClient::new("mock", vec![ok_text(r#"{"items": []}"#)]);
        let gateway = LLMGateway::new(Box::new(client), None);
        let prompts = PromptStore::new();
        let item = TodoItem::new("a", "do something unrealistic", "impossible criteria", 3);
        let outcome = Replanner::replan(&item, &failing_verification(), RootCause::UnrealisticCriteria, &gateway, &prompts).await;
        match outcome {
            StageOutcome::Ok(items) => assert!(items.is_empty()),
            _ => panic!("expected Ok outcome"),
        }
    }

    #[test]
    fn every_root_cause_has_a_strategy() {
        for cause in [
            RootCause::MissingPrerequisite,
            RootCause::PermissionIssue,
            RootCause::WrongParameters,
            RootCause::ToolExecutionFailed,
            RootCause::TimingIssue,
            RootCause::WrongApproach,
            RootCause::UnrealisticCriteria,
            RootCause::UnclearState,
            RootCause::VisionModelFailure,
            RootCause::ExecutionErrorVisible,
            RootCause::ToolsSucceededButWrongResult,
        ] {
            assert!(!strategy_for(cause).is_empty());
        }
    }
}
