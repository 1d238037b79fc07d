//! TodoPlanner - Stage 1 (`spec.md` 4.6)

use crate::domain::{EnrichedRequest, IdAllocator, TodoItem};
use crate::llm::{GatewayRequest, LLMGateway};
use crate::parser;
use crate::prompts::PromptStore;
use crate::stage::{StageErrorKind, StageOutcome};

pub struct TodoPlanner;

impl TodoPlanner {
    pub async fn plan(gateway: &LLMGateway, prompts: &PromptStore, enriched: &EnrichedRequest, default_max_attempts: u32) -> StageOutcome<Vec<TodoItem>> {
        let Ok(resolved) = prompts.resolve(
            "todo_planner",
            &serde_json::json!({
                "enriched": enriched.enriched,
                "implicit_requirements": enriched.implicit_requirements,
                "estimated_complexity": enriched.estimated_complexity,
            }),
        ) else {
            return StageOutcome::Fail(StageErrorKind::SchemaValidation, "todo_planner prompt missing".into());
        };

        let request = GatewayRequest { system: resolved.system, user: resolved.user, temperature: 0.3, max_tokens: 2048, json_object: true };

        let response = match gateway.call(request).await {
            Ok(response) => response,
            Err(err) => return StageOutcome::Fail(StageErrorKind::ModelUnavailable, format!("gateway call failed: {err}")),
        };

        let parsed = parser::parse(&response.text);
        let Some(raw_items) = parsed.value.get("items").and_then(|v| v.as_array()) else {
            return StageOutcome::Fail(StageErrorKind::ParseFailure, "no items array in response".into());
        };

        if raw_items.is_empty() {
            return StageOutcome::Fail(StageErrorKind::ParseFailure, "planner produced zero items".into());
        }

        let mut ids = IdAllocator::default();
        let items: Vec<TodoItem> = raw_items.iter().map(|raw| Self::build_item(raw, &mut ids, default_max_attempts)).collect();

        if parsed.fallback_parsed {
            StageOutcome::Fallback(items, "parser fell back while planning todos".into())
        } else {
            StageOutcome::Ok(items)
        }
    }

    fn build_item(raw: &serde_json::Value, ids: &mut IdAllocator, default_max_attempts: u32) -> TodoItem {
        let action = raw.get("action").and_then(|v| v.as_str()).unwrap_or("unspecified action").to_string();
        let success_criteria = raw.get("success_criteria").and_then(|v| v.as_str()).unwrap_or("completed without error").to_string();
        let max_attempts = raw.get("max_attempts").and_then(|v| v.as_u64()).map(|n| n as u32).unwrap_or(default_max_attempts);

        let mut item = TodoItem::new(ids.next_top_level(), action, success_criteria, max_attempts);

        if let Some(servers) = raw.get("suggested_servers").and_then(|v| v.as_array()) {
            for server in servers.iter().filter_map(|v| v.as_str()) {
                item.suggested_servers.insert(server.to_string());
            }
        }
        if let Some(dependencies) = raw.get("dependencies").and_then(|v| v.as_array()) {
            for dep in dependencies.iter().filter_map(|v| v.as_str()) {
                item.dependencies.insert(dep.to_string());
            }
        }

        item
    }
}
