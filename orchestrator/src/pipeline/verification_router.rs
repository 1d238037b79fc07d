//! VerificationRouter - Stage 2.3a (`spec.md` 4.10)

use crate::domain::{AdditionalCheck, TodoItem, VerificationDecision, VerificationPath};
use crate::keywords::transform_action_to_verification;
use crate::llm::{GatewayRequest, LLMGateway};
use crate::parser;
use crate::prompts::PromptStore;

/// Lightweight rule-based strategy object producing a heuristic
/// {method, confidence} before the advisory LLM call runs
struct HeuristicSignal {
    path: VerificationPath,
    confidence: f32,
}

fn heuristic_signal(item: &TodoItem) -> HeuristicSignal {
    let action = item.action.to_lowercase();
    let visual_cues = ["screen", "window", "click", "visible", "display", "gui"];
    let data_cues = ["file", "folder", "directory", "compute", "calculate", "write", "install"];

    if visual_cues.iter().any(|c| action.contains(c)) {
        HeuristicSignal { path: VerificationPath::Visual, confidence: 82.0 }
    } else if data_cues.iter().any(|c| action.contains(c)) {
        HeuristicSignal { path: VerificationPath::Data, confidence: 85.0 }
    } else {
        HeuristicSignal { path: VerificationPath::Hybrid, confidence: 55.0 }
    }
}

pub struct VerificationRouter;

impl VerificationRouter {
    pub async fn route(item: &TodoItem, gateway: &LLMGateway, prompts: &PromptStore) -> VerificationDecision {
        let heuristic = heuristic_signal(item);
        let verification_action = transform_action_to_verification(&item.action);
        let additional_checks = Self::additional_checks(item);

        let llm_recommendation = Self::ask_llm(item, gateway, prompts).await;

        // `spec.md` 4.10: "smart priority" - keep the heuristic unless the
        // LLM is >20 points stronger and confident, or the heuristic is weak.
        let (recommended_path, confidence, reason) = match llm_recommendation {
            Some((llm_path, llm_confidence, llm_reason)) if heuristic.confidence < 80.0 || llm_confidence > heuristic.confidence + 20.0 => {
                (llm_path, llm_confidence, llm_reason)
            }
            _ => (heuristic.path, heuristic.confidence, "heuristic rule match".to_string()),
        };

        VerificationDecision {
            visual_possible: matches!(recommended_path, VerificationPath::Visual | VerificationPath::Hybrid),
            confidence,
            reason,
            recommended_path,
            additional_checks,
            allow_visual_fallback: matches!(recommended_path, VerificationPath::Hybrid),
            verification_action,
        }
    }

    async fn ask_llm(item: &TodoItem, gateway: &LLMGateway, prompts: &PromptStore) -> Option<(VerificationPath, f32, String)> {
        let resolved = prompts
            .resolve("verification_router", &serde_json::json!({ "action": item.action, "success_criteria": item.success_criteria }))
            .ok()?;
        let request = GatewayRequest { system: resolved.system, user: resolved.user, temperature: 0.1, max_tokens: 256, json_object: true };
        let response = gateway.call(request).await.ok()?;
        let parsed = parser::parse(&response.text);
        if parsed.fallback_parsed {
            return None;
        }
        let path = match parsed.value.get("method")?.as_str()? {
            "visual" => VerificationPath::Visual,
            "mcp" | "data" => VerificationPath::Data,
            "hybrid" => VerificationPath::Hybrid,
            _ => return None,
        };
        let confidence = parsed.value.get("confidence").and_then(|v| v.as_f64())? as f32;
        let reason = parsed.value.get("reason").and_then(|v| v.as_str()).unwrap_or("LLM recommendation").to_string();
        Some((path, confidence, reason))
    }

    /// `spec.md` 4.10: action vocabulary -> data-path probe
    fn additional_checks(item: &TodoItem) -> Vec<AdditionalCheck> {
        let action = item.action.to_lowercase();
        let mut checks = Vec::new();

        if ["file", "folder", "directory"].iter().any(|c| action.contains(c)) {
            checks.push(AdditionalCheck {
                server: "filesystem".to_string(),
                tool: "get_file_info".to_string(),
                parameters: serde_json::json!({}),
                expected_evidence: "target path exists".to_string(),
            });
        }
        if ["browser", "page", "navigate", "website"].iter().any(|c| action.contains(c)) {
            checks.push(AdditionalCheck {
                server: "browser".to_string(),
                tool: "get_page_state".to_string(),
                parameters: serde_json::json!({}),
                expected_evidence: "page state matches success criteria".to_string(),
            });
        }
        if ["app", "application", "launch", "open"].iter().any(|c| action.contains(c)) {
            checks.push(AdditionalCheck {
                server: "shell".to_string(),
                tool: "run_script".to_string(),
                parameters: serde_json::json!({}),
                expected_evidence: "process is running".to_string(),
            });
        }
        if ["system", "process", "service"].iter().any(|c| action.contains(c)) {
            checks.push(AdditionalCheck {
                server: "shell".to_string(),
                tool: "run_command".to_string(),
                parameters: serde_json::json!({}),
                expected_evidence: "shell probe confirms system state".to_string(),
            });
        }
        checks
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
    async fn strong_heuristic_wins_over_weaker_llm() {
        let client = MockLlmClient::new("mock", vec![ok_text(r#"{"method": "visual", "confidence": 90, "reason": "llm"}"#)]);
        let gateway = LLMGateway::new(Box::new(client), None);
        let prompts = PromptStore::new();
        let item = TodoItem::new("a", "write file to disk", "file exists", 3);
        let decision = VerificationRouter::route(&item, &gateway, &prompts).await;
        assert_eq!(decision.recommended_path, VerificationPath::Data);
        assert_eq!(decision.verification_action, "verify contents of file to disk");
    }

    #[tokio::test]
    async fn llm_overrides_weak_heuristic_when_much_stronger() {
        let client = MockLlmClient::new("mock", vec![ok_text(r#"{"method": "visual", "confidence": 90, "reason": "clear ui signal"}"#)]);
        let gateway = LLMGateway::new(Box::new(client), None);
        let prompts = PromptStore::new();
        let item = TodoItem::new("a", "do the thing", "thing is done", 3);
        let decision = VerificationRouter::route(&item, &gateway, &prompts).await;
        assert_eq!(decision.recommended_path, VerificationPath::Visual);
        assert_eq!(decision.confidence, 90.0);
    }

    #[test]
    fn additional_checks_derive_from_action_vocabulary() {
        let item = TodoItem::new("a", "create a folder and open the application", "folder exists and app open", 3);
        let checks = VerificationRouter::additional_checks(&item);
        assert!(checks.iter().any(|c| c.server == "filesystem"));
        assert!(checks.iter().any(|c| c.server == "shell"));
    }
}
