//! StageRunner - the per-stage wrapper every pipeline call goes through
//! (`spec.md` 4.3): given a stage id it times the call, asks `ModelRegistry`
//! which model that stage is actually meant to use, and publishes the
//! started/completed/fallback events the CLI subscribes to for progress
//! printing.

use std::future::Future;
use std::time::Instant;

use crate::events::{EventBus, StageEvent};
use crate::llm::ModelRegistry;
use crate::stage::StageMeta;

pub struct StageRunner<'a> {
    events: &'a EventBus,
    model_registry: &'a ModelRegistry,
    session_id: String,
}

impl<'a> StageRunner<'a> {
    pub fn new(events: &'a EventBus, model_registry: &'a ModelRegistry, session_id: impl Into<String>) -> Self {
        Self { events, model_registry, session_id: session_id.into() }
    }

    /// Runs `body`, publishing `StageStarted` before and `StageCompleted`
    /// after with a measured `duration_ms`. `fallback_used` inspects the
    /// produced value to decide whether a `StageFallback` event should also
    /// fire. Returns the stage's own output alongside the `StageMeta` this
    /// call recorded.
    pub async fn run<T, F>(&self, stage_id: &str, fallback_used: impl FnOnce(&T) -> bool, body: F) -> (T, StageMeta)
    where
        F: Future<Output = T>,
    {
        self.events.publish(StageEvent::StageStarted { session_id: self.session_id.clone(), stage_id: stage_id.to_string() });

        let model_used = self.model_registry.resolve_available(stage_id).unwrap_or("none-available").to_string();
        let started = Instant::now();
        let result = body.await;
        let duration_ms = started.elapsed().as_millis() as u64;
        let fallback_used = fallback_used(&result);

        self.events.publish(StageEvent::StageCompleted {
            session_id: self.session_id.clone(),
            stage_id: stage_id.to_string(),
            duration_ms,
            fallback_used,
            model_used: model_used.clone(),
        });
        if fallback_used {
            self.events.publish(StageEvent::StageFallback { session_id: self.session_id.clone(), stage_id: stage_id.to_string(), reason: format!("{stage_id} fell back (model {model_used})") });
        }

        (result, StageMeta { stage_id: stage_id.to_string(), prompt_id: stage_id.to_string(), model_used, duration_ms, fallback_used })
    }
}

/// The process-wide defaults every stage is registered under
/// (`spec.md` §4.2). Temperatures/token caps mirror what each stage's own
/// `GatewayRequest` already asks for; `ModelRegistry` tracks them
/// independently so availability/fallback bookkeeping survives a stage
/// changing its own request shape.
pub fn default_model_registry() -> ModelRegistry {
    use crate::llm::StageModelConfig;

    let mut registry = ModelRegistry::new(StageModelConfig::new("primary", 0.2, 1024).with_fallback("fallback"));
    registry.register_stage("mode_selector", StageModelConfig::new("primary", 0.0, 256).with_fallback("fallback"));
    registry.register_stage("chat", StageModelConfig::new("primary", 0.7, 512).with_fallback("fallback"));
    registry.register_stage("self_analysis", StageModelConfig::new("primary", 0.1, 2048).with_fallback("fallback"));
    registry.register_stage("context_enricher", StageModelConfig::new("primary", 0.2, 1024).with_fallback("fallback"));
    registry.register_stage("todo_planner", StageModelConfig::new("primary", 0.3, 2048).with_fallback("fallback"));
    registry.register_stage("server_selector", StageModelConfig::new("primary", 0.1, 512).with_fallback("fallback"));
    registry.register_stage("tool_planner", StageModelConfig::new("primary", 0.2, 1024).with_fallback("fallback"));
    registry.register_stage("verification_router", StageModelConfig::new("primary", 0.1, 256).with_fallback("fallback"));
    registry.register_stage("verifier", StageModelConfig::new("primary", 0.0, 0).with_fallback("fallback"));
    registry.register_stage("replanner", StageModelConfig::new("primary", 0.3, 1024).with_fallback("fallback"));
    registry.register_stage("summarizer", StageModelConfig::new("primary", 0.4, 512).with_fallback("fallback"));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;

    #[tokio::test]
    async fn run_publishes_started_and_completed_with_measured_duration() {
        let events = EventBus::new(16);
        let mut receiver = events.subscribe();
        let registry = default_model_registry();
        let runner = StageRunner::new(&events, &registry, "s1");

        let (value, meta) = runner.run("mode_selector", |v: &i32| *v < 0, async { 42 }).await;
        assert_eq!(value, 42);
        assert_eq!(meta.model_used, "primary");
        assert!(!meta.fallback_used);

        match receiver.recv().await.unwrap() {
            StageEvent::StageStarted { stage_id, .. } => assert_eq!(stage_id, "mode_selector"),
            other => panic!("expected StageStarted, got {other:?}"),
        }
        match receiver.recv().await.unwrap() {
            StageEvent::StageCompleted { stage_id, fallback_used, .. } => {
                assert_eq!(stage_id, "mode_selector");
                assert!(!fallback_used);
            }
            other => panic!("expected StageCompleted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn run_publishes_fallback_event_when_flagged() {
        let events = EventBus::new(16);
        let mut receiver = events.subscribe();
        let registry = default_model_registry();
        let runner = StageRunner::new(&events, &registry, "s1");

        runner.run("context_enricher", |v: &i32| *v == 0, async { 0 }).await;

        receiver.recv().await.unwrap(); // StageStarted
        receiver.recv().await.unwrap(); // StageCompleted
        match receiver.recv().await.unwrap() {
            StageEvent::StageFallback { stage_id, .. } => assert_eq!(stage_id, "context_enricher"),
            other => panic!("expected StageFallback, got {other:?}"),
        }
    }

    #[test]
    fn default_registry_resolves_every_stage_to_the_primary_model() {
        let registry = default_model_registry();
        for stage in ["mode_selector", "chat", "self_analysis", "context_enricher", "todo_planner", "server_selector", "tool_planner", "verification_router", "verifier", "replanner", "summarizer"] {
            assert_eq!(registry.resolve_available(stage), Some("primary"));
        }
    }
}
