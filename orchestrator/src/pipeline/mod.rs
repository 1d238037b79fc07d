//! Stage 0 -> 8 control flow (`spec.md` 2): wires the nine staged
//! components plus the chat and self-analysis paths into one
//! `Orchestrator::execute` entrypoint.

pub mod chat;
pub mod context_enricher;
pub mod mode_selector;
pub mod replanner;
pub mod server_selector;
pub mod stage_runner;
pub mod summarizer;
pub mod todo_planner;
pub mod tool_executor;
pub mod tool_planner;
pub mod verification_router;
pub mod verifier;

pub use chat::ChatResponder;
pub use context_enricher::ContextEnricher;
pub use mode_selector::ModeSelector;
pub use replanner::Replanner;
pub use server_selector::ServerSelector;
pub use stage_runner::StageRunner;
pub use summarizer::{FinalSummarizer, FinalSummary};
pub use todo_planner::TodoPlanner;
pub use tool_executor::ToolExecutor;
pub use tool_planner::ToolPlanner;
pub use verification_router::VerificationRouter;
pub use verifier::{NextAction, RootCause, Verifier, VerifierOutcome};

use std::future::Future;
use std::pin::Pin;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::capture::ScreenCapture;
use crate::domain::{ModeKind, TodoItem, TodoStatus, Verification, VerificationMethod};
use crate::events::EventBus;
use crate::llm::{LLMGateway, ModelRegistry};
use crate::prompts::PromptStore;
use crate::self_analysis::SelfAnalyzer;
use crate::session::{mode_collides, Session};
use crate::stage::StageOutcome;
use crate::vision::VisionModel;
use mcpkit::McpRegistry;

/// One call into the orchestrator (`spec.md` 6: "execute(context) on the
/// orchestrator with {userMessage, session, password?, ttsSettings?,
/// container}"). `container` is the set of collaborators `Orchestrator`
/// already holds, so it is not threaded through per-call.
pub struct ExecutionRequest {
    pub user_message: String,
    pub password: Option<String>,
    pub tts_enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TtsSettings {
    pub enabled: bool,
    pub phrase: Option<String>,
}

/// The mutually-exclusive body of an `ExecutionResult`, keyed by mode
/// (`spec.md` 6: "analysis|plan|result").
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum OutcomeBody {
    Chat { reply: String },
    Analysis { findings: Vec<String>, todo: Vec<TodoItem>, intervention_handed_off: bool },
    Task { plan: Vec<TodoItem>, result: Option<FinalSummary> },
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub success: bool,
    /// `spec.md` 6: "{success, analysis|plan|result, metadata, tts_settings,
    /// mode}" - flattened so the active variant's fields surface directly
    /// at the top level rather than nested under a wrapper key.
    #[serde(flatten)]
    pub body: OutcomeBody,
    pub metadata: serde_json::Value,
    pub tts_settings: TtsSettings,
    pub mode: ModeKind,
}

/// Shared, process-wide pipeline collaborators plus the dev-mode engine;
/// holds no per-session state itself (`spec.md` 3: sessions live in
/// `SessionStore`, looked up by the caller and passed in per call).
pub struct Orchestrator {
    pub gateway: LLMGateway,
    pub prompts: PromptStore,
    pub registry: McpRegistry,
    pub vision: Box<dyn VisionModel>,
    pub capture: Box<dyn ScreenCapture>,
    pub analyzer: SelfAnalyzer,
    pub events: EventBus,
    pub model_registry: ModelRegistry,
    pub default_max_attempts: u32,
}

impl Orchestrator {
    pub fn new(
        gateway: LLMGateway,
        prompts: PromptStore,
        registry: McpRegistry,
        vision: Box<dyn VisionModel>,
        capture: Box<dyn ScreenCapture>,
        analyzer: SelfAnalyzer,
        default_max_attempts: u32,
    ) -> Self {
        Self { gateway, prompts, registry, vision, capture, analyzer, events: EventBus::default(), model_registry: stage_runner::default_model_registry(), default_max_attempts }
    }

    fn stage_runner<'a>(&'a self, session_id: &str) -> StageRunner<'a> {
        StageRunner::new(&self.events, &self.model_registry, session_id.to_string())
    }

    /// Stage 0 dispatch: classify the utterance, then route to the chat,
    /// dev, or task path. Mode collisions with an in-flight session mode
    /// (`spec.md` 9) suspend the colliding mode rather than rejecting the
    /// request outright.
    pub async fn execute(&self, session: &mut Session, request: ExecutionRequest) -> ExecutionResult {
        let runner = self.stage_runner(&session.id);
        let recent_turns: String = session.recent_turns().map(|t| format!("{}: {}", t.role, t.text)).collect::<Vec<_>>().join("\n");
        let (mode_outcome, _meta) = runner
            .run("mode_selector", |o: &StageOutcome<crate::domain::Mode>| !o.is_ok(), ModeSelector::select(&self.gateway, &self.prompts, &request.user_message, &recent_turns))
            .await;
        let Some(mode) = mode_outcome.into_output() else {
            return self.degraded_result(ModeKind::Chat, "mode_selector produced no usable classification");
        };

        session.push_turn("user", request.user_message.clone());

        if mode_collides(session, mode.kind) {
            info!(session_id = %session.id, incoming = %mode.kind, "Orchestrator::execute: mode collision, suspending in-flight mode");
            if mode.kind == ModeKind::Dev {
                session.suspend_task_mode();
            }
        }

        let result = match mode.kind {
            ModeKind::Chat => self.run_chat(session, &request).await,
            ModeKind::Dev => self.run_dev(session, &request).await,
            ModeKind::Task => self.run_task(session, &request).await,
        };

        if mode.kind != ModeKind::Dev {
            session.enter_idle();
        }
        result
    }

    async fn run_chat(&self, session: &mut Session, request: &ExecutionRequest) -> ExecutionResult {
        let runner = self.stage_runner(&session.id);
        let recent_turns: String = session.recent_turns().map(|t| format!("{}: {}", t.role, t.text)).collect::<Vec<_>>().join("\n");
        let (outcome, _meta) = runner.run("chat", |o: &StageOutcome<String>| !o.is_ok(), ChatResponder::reply(&self.gateway, &self.prompts, &request.user_message, &recent_turns)).await;
        let fallback_used = !outcome.is_ok();
        let reply = outcome.into_output().unwrap_or_else(|| "Sorry, I'm having trouble responding right now.".to_string());
        session.push_turn("assistant", reply.clone());

        ExecutionResult {
            success: true,
            tts_settings: TtsSettings { enabled: request.tts_enabled, phrase: Some(reply.clone()) },
            body: OutcomeBody::Chat { reply },
            metadata: serde_json::json!({ "fallback_used": fallback_used }),
            mode: ModeKind::Chat,
        }
    }

    /// `spec.md` 4.13: dev mode gathers context, analyzes, builds a
    /// hierarchical TODO, and optionally hands an intervention plan off
    /// to the task pipeline under a password gate.
    async fn run_dev(&self, session: &mut Session, request: &ExecutionRequest) -> ExecutionResult {
        session.enter_task_mode();
        session.suspend_task_mode();

        let runner = self.stage_runner(&session.id);
        let started_at = std::time::SystemTime::now();
        let context = self.analyzer.gather_context(std::path::Path::new("/var/log/orchestrator"), started_at);
        let (findings, _meta) = runner.run("self_analysis", |f: &Vec<_>| f.is_empty(), self.analyzer.analyze(&self.gateway, &self.prompts, &context)).await;
        let todo = self.analyzer.build_hierarchical_todo(&findings);

        let intervention = self.analyzer.attempt_intervention(request.password.as_deref(), &request.user_message, &findings);
        let (plan, intervention_handed_off) = match intervention {
            Ok(plan) => {
                session.resume_task_mode();
                session.set_last_plan(plan.clone());
                (plan, true)
            }
            Err(err) => {
                debug!(%err, "Orchestrator::run_dev: no intervention handoff");
                (todo, false)
            }
        };

        ExecutionResult {
            success: true,
            tts_settings: TtsSettings { enabled: request.tts_enabled, phrase: None },
            body: OutcomeBody::Analysis {
                findings: findings.iter().map(|f| f.description.clone()).collect(),
                todo: plan,
                intervention_handed_off,
            },
            metadata: serde_json::json!({ "fallback_used": context.fallback, "finding_count": findings.len() }),
            mode: ModeKind::Dev,
        }
    }

    /// Stages 0.5 through 8: enrich, plan, then run each `TodoItem` to
    /// completion respecting the dependency DAG (`spec.md` 5), finishing
    /// with `FinalSummarizer`.
    async fn run_task(&self, session: &mut Session, request: &ExecutionRequest) -> ExecutionResult {
        session.enter_task_mode();
        let runner = self.stage_runner(&session.id);

        let (enriched_outcome, _meta) = runner.run("context_enricher", |o: &StageOutcome<crate::domain::EnrichedRequest>| !o.is_ok(), ContextEnricher::enrich(&self.gateway, &self.prompts, &request.user_message)).await;
        let enriched = enriched_outcome.into_output().unwrap_or_else(|| crate::domain::EnrichedRequest::fallback(request.user_message.clone()));

        let (plan_outcome, _meta) = runner.run("todo_planner", |o: &StageOutcome<Vec<TodoItem>>| !o.is_ok(), TodoPlanner::plan(&self.gateway, &self.prompts, &enriched, self.default_max_attempts)).await;
        let Some(mut items) = plan_outcome.into_output() else {
            return self.degraded_result(ModeKind::Task, "todo_planner produced no usable plan");
        };

        self.run_ready_items(session, &mut items).await;

        let (summary_outcome, _meta) = runner.run("summarizer", |o: &StageOutcome<FinalSummary>| !o.is_ok(), FinalSummarizer::summarize(&items, &self.gateway, &self.prompts)).await;
        let summary = summary_outcome.into_output();
        session.set_last_plan(items.clone());

        let all_completed = items.iter().all(|i| i.status == TodoStatus::Completed);
        ExecutionResult {
            success: all_completed,
            tts_settings: TtsSettings { enabled: request.tts_enabled, phrase: summary.as_ref().map(|s| s.tts_phrase.clone()) },
            body: OutcomeBody::Task { plan: items, result: summary.clone() },
            metadata: serde_json::json!({ "session_id": session.id }),
            mode: ModeKind::Task,
        }
    }

    /// Repeatedly processes whatever items have all dependencies
    /// satisfied, until every item is terminal or no further progress can
    /// be made (a dependency cycle, which abandons the stuck items).
    async fn run_ready_items(&self, session: &Session, items: &mut Vec<TodoItem>) {
        loop {
            let completed_ids: std::collections::HashSet<String> =
                items.iter().filter(|i| i.status == TodoStatus::Completed).map(|i| i.id.clone()).collect();

            let ready_indices: Vec<usize> = items
                .iter()
                .enumerate()
                .filter(|(_, i)| !i.status.is_terminal() && i.dependencies.iter().all(|d| completed_ids.contains(d)))
                .map(|(idx, _)| idx)
                .collect();

            if ready_indices.is_empty() {
                let stuck: Vec<&str> = items.iter().filter(|i| !i.status.is_terminal()).map(|i| i.id.as_str()).collect();
                if !stuck.is_empty() {
                    warn!(ids = ?stuck, "Orchestrator::run_ready_items: no further progress possible, abandoning remaining items");
                    for item in items.iter_mut().filter(|i| !i.status.is_terminal()) {
                        item.mark_abandoned(unverifiable("dependency could not be satisfied"));
                    }
                }
                return;
            }

            let known_servers = self.registry.known_servers();
            for idx in ready_indices {
                let mut item = std::mem::replace(&mut items[idx], TodoItem::new("", "", "", 0));
                self.process_item(session, &mut item, &known_servers).await;
                items[idx] = item;
            }
        }
    }

    /// Stages 2.0 through 3.6 for one `TodoItem`: select servers, plan and
    /// run tool calls, route and run verification, then advance, retry, or
    /// replan depending on the Verifier's decision.
    fn process_item<'a>(&'a self, session: &'a Session, item: &'a mut TodoItem, known_servers: &'a [String]) -> Pin<Box<dyn Future<Output = ()> + 'a>> {
        Box::pin(async move {
            let runner = self.stage_runner(&session.id);
            let (selection_outcome, _meta) = runner.run("server_selector", |o: &StageOutcome<crate::domain::ServerSelection>| !o.is_ok(), ServerSelector::select(item, known_servers, &self.gateway, &self.prompts)).await;
            let Some(selection) = selection_outcome.into_output() else {
                item.mark_abandoned(unverifiable("server selection failed"));
                return;
            };

            if selection.needs_split {
                let Some((first, second)) = selection.suggested_partition.clone() else {
                    item.mark_abandoned(unverifiable("needs_split with no partition suggested"));
                    return;
                };
                let mut left = TodoItem::new(crate::domain::IdAllocator::child_id(&item.id, 0), item.action.clone(), item.success_criteria.clone(), item.max_attempts);
                left.suggested_servers = first.into_iter().collect();
                let mut right = TodoItem::new(crate::domain::IdAllocator::child_id(&item.id, 1), item.action.clone(), item.success_criteria.clone(), item.max_attempts);
                right.suggested_servers = second.into_iter().collect();

                self.process_item(session, &mut left, known_servers).await;
                self.process_item(session, &mut right, known_servers).await;
                let both_completed = left.status == TodoStatus::Completed && right.status == TodoStatus::Completed;
                let verification = if both_completed { verified("both split halves completed") } else { unverifiable("one or both split halves did not complete") };
                item.sub_items = vec![left, right];
                if both_completed {
                    item.mark_completed(verification);
                } else {
                    item.mark_abandoned(verification);
                }
                return;
            }

            item.mcp_servers = selection.selected_servers.clone();
            self.run_tool_loop(session, item, &selection).await;
        })
    }

    /// The ToolPlanner -> ToolExecutor -> VerificationRouter -> Verifier
    /// loop for one already-server-selected item, bounded by
    /// `max_attempts` and recursing into the `Replanner` on `Adjust`.
    fn run_tool_loop<'a>(
        &'a self,
        session: &'a Session,
        item: &'a mut TodoItem,
        selection: &'a crate::domain::ServerSelection,
    ) -> Pin<Box<dyn Future<Output = ()> + 'a>> {
        Box::pin(async move {
            let runner = self.stage_runner(&session.id);
            let available_tools = self.describe_available_tools(&selection.selected_servers);

            loop {
                let (plan_outcome, _meta) = runner.run("tool_planner", |o: &StageOutcome<crate::domain::ToolPlan>| !o.is_ok(), ToolPlanner::plan(&item.action, selection, &available_tools, &self.gateway, &self.prompts)).await;
                let Some(plan) = plan_outcome.into_output() else {
                    item.record_attempt();
                    if item.attempts_exhausted() {
                        item.mark_abandoned(unverifiable("tool planning failed repeatedly"));
                    } else {
                        continue;
                    }
                    return;
                };

                let mode = ToolExecutor::decide_mode(&plan, &item.action, item.attempt);
                let report = ToolExecutor::execute(&self.registry, &plan, mode).await;
                item.execution_results = report.results.clone();

                let (decision, _meta) = runner.run("verification_router", |_: &crate::domain::VerificationDecision| false, VerificationRouter::route(item, &self.gateway, &self.prompts)).await;
                let (outcome, _meta) =
                    runner.run("verifier", |o: &VerifierOutcome| o.verification.fallback_detected, Verifier::verify(item, &decision, &session.id, self.capture.as_ref(), self.vision.as_ref(), &self.registry)).await;
                item.record_attempt();

                match outcome.next_action {
                    NextAction::Continue => {
                        item.mark_completed(outcome.verification);
                        return;
                    }
                    NextAction::Retry => {
                        if item.attempts_exhausted() {
                            item.mark_abandoned(outcome.verification);
                            return;
                        }
                        continue;
                    }
                    NextAction::Adjust => {
                        let root_cause = outcome.root_cause.unwrap_or(RootCause::WrongApproach);
                        let (replan_outcome, _meta) = runner.run("replanner", |o: &StageOutcome<Vec<TodoItem>>| !o.is_ok(), Replanner::replan(item, &outcome.verification, root_cause, &self.gateway, &self.prompts)).await;
                        let Some(children) = replan_outcome.into_output() else {
                            item.mark_abandoned(outcome.verification);
                            return;
                        };
                        if children.is_empty() {
                            item.mark_abandoned(outcome.verification);
                            return;
                        }

                        let known_servers = self.registry.known_servers();
                        let mut children = children;
                        for child in children.iter_mut() {
                            self.process_item(session, child, &known_servers).await;
                        }
                        let all_completed = children.iter().all(|c| c.status == TodoStatus::Completed);
                        item.sub_items = children;
                        if all_completed {
                            item.mark_completed(outcome.verification);
                        } else {
                            item.mark_abandoned(outcome.verification);
                        }
                        return;
                    }
                }
            }
        })
    }

    fn describe_available_tools(&self, servers: &[String]) -> String {
        servers
            .iter()
            .filter_map(|name| self.registry.server(name))
            .map(|server| {
                let tools = server.tools.iter().map(|t| format!("{}__{}: {}", server.name, t.name, t.description)).collect::<Vec<_>>().join("\n");
                format!("# {}\n{tools}", server.name)
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn degraded_result(&self, mode: ModeKind, reason: &str) -> ExecutionResult {
        warn!(reason, "Orchestrator::execute: degraded result");
        ExecutionResult {
            success: false,
            tts_settings: TtsSettings { enabled: false, phrase: None },
            body: OutcomeBody::Chat { reply: "Something went wrong processing that request.".to_string() },
            metadata: serde_json::json!({ "reason": reason }),
            mode,
        }
    }
}

fn verified(reason: &str) -> Verification {
    Verification {
        verified: true,
        confidence: 90,
        reason: reason.to_string(),
        method: VerificationMethod::Mcp,
        visual_evidence: None,
        screenshot_path: None,
        vision_model: None,
        mcp_results: None,
        tts_phrase: reason.to_string(),
        fallback_detected: false,
        security_checks_passed: true,
    }
}

fn unverifiable(reason: &str) -> Verification {
    Verification {
        verified: false,
        confidence: 0,
        reason: reason.to_string(),
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
