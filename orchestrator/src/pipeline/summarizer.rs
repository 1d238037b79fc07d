//! FinalSummarizer - Stage 8 (`spec.md` 2, 4 "FinalSummarizer")

use serde::{Deserialize, Serialize};

use crate::domain::TodoItem;
use crate::llm::{GatewayRequest, LLMGateway};
use crate::parser;
use crate::prompts::PromptStore;
use crate::stage::StageOutcome;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalSummary {
    pub summary: String,
    pub tts_phrase: String,
}

pub struct FinalSummarizer;

impl FinalSummarizer {
    pub async fn summarize(items: &[TodoItem], gateway: &LLMGateway, prompts: &PromptStore) -> StageOutcome<FinalSummary> {
        let completed = items.iter().filter(|i| i.status.is_terminal() && i.verification.as_ref().is_some_and(|v| v.verified)).count();
        let abandoned = items.iter().filter(|i| i.status == crate::domain::TodoStatus::Abandoned).count();
        let item_summaries: Vec<String> = items
            .iter()
            .map(|i| format!("{}: {} ({:?})", i.id, i.action, i.status))
            .collect();

        let Ok(resolved) = prompts.resolve(
            "final_summarizer",
            &serde_json::json!({ "completed_count": completed, "abandoned_count": abandoned, "item_summaries": item_summaries.join("; ") }),
        ) else {
            return StageOutcome::Fallback(Self::fallback(items, completed), "final_summarizer prompt missing".into());
        };

        let request = GatewayRequest { system: resolved.system, user: resolved.user, temperature: 0.4, max_tokens: 512, json_object: true };

        let response = match gateway.call(request).await {
            Ok(response) => response,
            Err(err) => return StageOutcome::Fallback(Self::fallback(items, completed), format!("gateway call failed: {err}")),
        };

        let parsed = parser::parse(&response.text);
        let (Some(summary), Some(tts_phrase)) = (
            parsed.value.get("summary").and_then(|v| v.as_str()).map(String::from),
            parsed.value.get("tts_phrase").and_then(|v| v.as_str()).map(String::from),
        ) else {
            return StageOutcome::Fallback(Self::fallback(items, completed), "summary or tts_phrase missing from response".into());
        };

        let result = FinalSummary { summary, tts_phrase };
        if parsed.fallback_parsed {
            StageOutcome::Fallback(result, "parser fell back while summarizing".into())
        } else {
            StageOutcome::Ok(result)
        }
    }

    fn fallback(items: &[TodoItem], completed: usize) -> FinalSummary {
        let summary = format!("Completed {completed} of {} planned steps.", items.len());
        FinalSummary { summary: summary.clone(), tts_phrase: summary }
    }
}
