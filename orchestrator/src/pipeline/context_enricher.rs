//! ContextEnricher - Stage 0.5 (`spec.md` 4.5)

use crate::domain::EnrichedRequest;
use crate::llm::{GatewayRequest, LLMGateway};
use crate::parser;
use crate::prompts::PromptStore;
use crate::stage::StageOutcome;

pub struct ContextEnricher;

impl ContextEnricher {
    pub async fn enrich(gateway: &LLMGateway, prompts: &PromptStore, original: &str) -> StageOutcome<EnrichedRequest> {
        let Ok(resolved) = prompts.resolve("context_enricher", &serde_json::json!({ "original": original })) else {
            return StageOutcome::Fallback(EnrichedRequest::fallback(original), "context_enricher prompt missing".into());
        };

        let request = GatewayRequest { system: resolved.system, user: resolved.user, temperature: 0.2, max_tokens: 1024, json_object: true };

        let response = match gateway.call(request).await {
            Ok(response) => response,
            Err(err) => return StageOutcome::Fallback(EnrichedRequest::fallback(original), format!("gateway call failed: {err}")),
        };

        let parsed = parser::parse(&response.text);
        match Self::build(original, &parsed.value) {
            Some(enriched) if !parsed.fallback_parsed => StageOutcome::Ok(enriched),
            Some(enriched) => StageOutcome::Fallback(enriched, "parser fell back while enriching".into()),
            None => StageOutcome::Fallback(EnrichedRequest::fallback(original), "complexity missing or out of range".into()),
        }
    }

    /// `spec.md` 4.5: "Complexity must be numeric 1..10 or rejected."
    fn build(original: &str, value: &serde_json::Value) -> Option<EnrichedRequest> {
        let complexity = value.get("estimated_complexity")?.as_u64()?;
        if !(1..=10).contains(&complexity) {
            return None;
        }
        let enriched = value.get("enriched").and_then(|v| v.as_str()).unwrap_or(original).to_string();
        let implicit_requirements = value
            .get("implicit_requirements")
            .and_then(|v| v.as_array())
            .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default();
        let prerequisites = value
            .get("prerequisites")
            .and_then(|v| v.as_array())
            .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default();
        let technical_specifications = value
            .get("technical_specifications")
            .and_then(|v| v.as_object())
            .map(|o| o.iter().filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string()))).collect())
            .unwrap_or_default();

        Some(EnrichedRequest {
            original: original.to_string(),
            enriched,
            implicit_requirements,
            prerequisites,
            technical_specifications,
            estimated_complexity: complexity as u8,
            fallback: false,
        })
    }
}
