//! ModeSelector - Stage 0 (`spec.md` 4.4)

use tracing::debug;

use crate::domain::{Mode, ModeKind};
use crate::keywords::{is_action_verb, is_dev_marker};
use crate::llm::{GatewayRequest, LLMGateway};
use crate::parser;
use crate::prompts::PromptStore;
use crate::stage::{StageErrorKind, StageOutcome};

pub struct ModeSelector;

impl ModeSelector {
    pub async fn select(gateway: &LLMGateway, prompts: &PromptStore, utterance: &str, recent_turns: &str) -> StageOutcome<Mode> {
        let Ok(resolved) = prompts.resolve("mode_selector", &serde_json::json!({ "utterance": utterance, "recent_turns": recent_turns })) else {
            return StageOutcome::Fail(StageErrorKind::SchemaValidation, "mode_selector prompt missing".into());
        };

        let request = GatewayRequest { system: resolved.system, user: resolved.user, temperature: 0.0, max_tokens: 256, json_object: true };

        match gateway.call(request).await {
            Ok(response) => {
                let parsed = parser::parse(&response.text);
                if let Some(mode) = Self::normalize_mode(&parsed.value) {
                    let confidence = parsed.value.get("confidence").and_then(|v| v.as_f64()).unwrap_or(0.5) as f32;
                    let reasoning = parsed.value.get("reasoning").and_then(|v| v.as_str()).unwrap_or("").to_string();
                    let result = Mode { kind: mode, confidence: confidence.clamp(0.0, 1.0), reasoning };
                    if parsed.fallback_parsed {
                        StageOutcome::Fallback(result, "parser fell back to keyword probe".into())
                    } else {
                        StageOutcome::Ok(result)
                    }
                } else {
                    StageOutcome::Fallback(Self::keyword_probe(utterance), "parsed response had no recognizable mode".into())
                }
            }
            Err(err) => {
                debug!(%err, "ModeSelector::select: gateway call failed, applying keyword fallback");
                StageOutcome::Fallback(Self::keyword_probe(utterance), format!("gateway call failed: {err}"))
            }
        }
    }

    /// `spec.md` 4.4: normalize synonyms ("greeting"/"question"/"casual" ->
    /// chat; "action"/"command" -> task; "self-analysis" -> dev)
    fn normalize_mode(value: &serde_json::Value) -> Option<ModeKind> {
        let raw = value.get("mode")?.as_str()?.to_lowercase();
        match raw.as_str() {
            "chat" | "greeting" | "question" | "casual" => Some(ModeKind::Chat),
            "task" | "action" | "command" => Some(ModeKind::Task),
            "dev" | "self-analysis" | "self_analysis" => Some(ModeKind::Dev),
            _ => None,
        }
    }

    /// `spec.md` 4.4: "any dev markers -> dev; any action verb -> task;
    /// otherwise chat with confidence 0.5."
    fn keyword_probe(utterance: &str) -> Mode {
        if is_dev_marker(utterance) {
            Mode { kind: ModeKind::Dev, confidence: 0.6, reasoning: "matched a dev-mode keyword".into() }
        } else if is_action_verb(utterance) {
            Mode { kind: ModeKind::Task, confidence: 0.6, reasoning: "matched an imperative action verb".into() }
        } else {
            Mode { kind: ModeKind::Chat, confidence: 0.5, reasoning: "no strong signal, defaulting to chat".into() }
        }
    }
}
