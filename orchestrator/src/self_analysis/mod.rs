//! SelfAnalyzer - dev mode: log/process introspection, hierarchical
//! findings, recursive deepening, and password-gated intervention handoff
//! to the task pipeline (`spec.md` 4.13).

mod password;
mod recursion;

pub use password::verify_password;
pub use recursion::{DeepenThresholds, Finding, RecursionGuard, DEFAULT_MAX_DEPTH};

use std::collections::HashMap;
use std::time::SystemTime;
use tracing::{debug, warn};

use crate::domain::{IdAllocator, TodoItem, TodoStatus};
use crate::keywords::is_intervention_request;
use crate::llm::{GatewayRequest, LLMGateway};
use crate::parser;
use crate::prompts::PromptStore;

/// `spec.md` 3: AnalysisContext
#[derive(Debug, Clone, serde::Serialize)]
pub struct AnalysisContext {
    pub logs: selfctx::AnalysisLogs,
    pub memory_usage_kb: u64,
    pub uptime_ms: u64,
    pub timestamp_ms: i64,
    pub fallback: bool,
}

pub struct SelfAnalyzer {
    password: Option<String>,
    thresholds: DeepenThresholds,
    max_depth: u8,
}

impl SelfAnalyzer {
    pub fn new(password: Option<String>, thresholds: DeepenThresholds) -> Self {
        Self { password, thresholds, max_depth: DEFAULT_MAX_DEPTH }
    }

    /// `spec.md` 4.13: "gathers log tails...and process info via the MCP
    /// filesystem server; if unavailable, returns a fallback context
    /// flagged as such."
    pub fn gather_context(&self, log_dir: &std::path::Path, started_at: SystemTime) -> AnalysisContext {
        let paths = selfctx::log_paths_in(log_dir);
        match selfctx::gather_logs(&paths, selfctx::DEFAULT_TAIL_LINES) {
            Ok(logs) => {
                let snapshot = selfctx::process_snapshot(started_at);
                AnalysisContext { logs, memory_usage_kb: snapshot.memory_usage_kb, uptime_ms: snapshot.uptime_ms, timestamp_ms: snapshot.timestamp_ms, fallback: false }
            }
            Err(err) => {
                warn!(%err, "SelfAnalyzer::gather_context: falling back, logs unavailable");
                AnalysisContext {
                    logs: selfctx::AnalysisLogs { error: Vec::new(), orchestrator: Vec::new(), frontend: Vec::new(), metrics: Vec::new() },
                    memory_usage_kb: 0,
                    uptime_ms: 0,
                    timestamp_ms: 0,
                    fallback: true,
                }
            }
        }
    }

    /// `spec.md` 4.13: "calls LLMGateway for the analysis prompt with
    /// JSON-object response mode."
    pub async fn analyze(&self, gateway: &LLMGateway, prompts: &PromptStore, context: &AnalysisContext) -> Vec<Finding> {
        let variables = serde_json::json!({
            "error_log": context.logs.error,
            "orchestrator_log": context.logs.orchestrator,
            "memory_usage_kb": context.memory_usage_kb,
            "uptime_ms": context.uptime_ms,
        });

        let Ok(resolved) = prompts.resolve("self_analysis", &variables) else {
            return Vec::new();
        };

        let request = GatewayRequest { system: resolved.system, user: resolved.user, temperature: 0.1, max_tokens: 2048, json_object: true };
        let Ok(response) = gateway.call(request).await else {
            return Vec::new();
        };

        let parsed = parser::parse(&response.text);
        let findings = parsed.value.get("findings").cloned().unwrap_or_default();
        serde_json::from_value::<Vec<RawFinding>>(findings)
            .unwrap_or_default()
            .into_iter()
            .map(|raw| Finding { signature: format!("{}:{}", raw.title, raw.file_path), error_rate: raw.error_rate, complexity: raw.complexity, description: raw.description })
            .collect()
    }

    /// `spec.md` 4.13: "builds a hierarchical TODO: top-level items with
    /// sub-items generated per-problem; runs a recursive analysis loop
    /// that may deepen items."
    pub fn build_hierarchical_todo(&self, findings: &[Finding]) -> Vec<TodoItem> {
        let mut ids = IdAllocator::default();
        let mut guard = RecursionGuard::new(self.max_depth);
        let mut top_level = Vec::new();

        for finding in findings {
            let id = ids.next_top_level();
            let mut item = TodoItem::new(id.clone(), format!("address: {}", finding.description), "problem no longer reproduces".to_string(), 3);
            Self::deepen(&mut item, finding, &id, 0, &mut guard, &self.thresholds);
            top_level.push(item);
        }

        top_level
    }

    /// Recursively appends `.a`/`.a.a`/... sub-items for as long as
    /// `RecursionGuard` keeps approving the next depth, so the configured
    /// cap (default `DEFAULT_MAX_DEPTH`) is actually reachable rather than
    /// only ever producing one level.
    fn deepen(parent: &mut TodoItem, finding: &Finding, parent_id: &str, depth: u8, guard: &mut RecursionGuard, thresholds: &DeepenThresholds) {
        let probe = Finding { signature: format!("{}:depth{depth}", finding.signature), ..finding.clone() };
        if !guard.should_expand(&probe, depth, thresholds) {
            return;
        }
        let sub_id = format!("{parent_id}.a");
        let mut sub_item = TodoItem::new(sub_id.clone(), format!("deep-dive: {}", finding.description), "root cause identified".to_string(), 3);
        Self::deepen(&mut sub_item, finding, &sub_id, depth + 1, guard, thresholds);
        parent.sub_items.push(sub_item);
    }

    /// `spec.md` 4.13: "on successful password verification plus an
    /// explicit user intervention verb, converts analysis findings into a
    /// task-mode plan...and hands the plan to the task pipeline."
    pub fn attempt_intervention(&self, password_attempt: Option<&str>, user_message: &str, findings: &[Finding]) -> Result<Vec<TodoItem>, InterventionError> {
        let Some(expected) = &self.password else {
            return Err(InterventionError::AuthRequired);
        };
        let Some(attempt) = password_attempt else {
            return Err(InterventionError::AuthRequired);
        };
        if !verify_password(attempt, expected) {
            return Err(InterventionError::AuthRequired);
        }
        if !is_intervention_request(user_message) {
            return Err(InterventionError::NoInterventionIntent);
        }

        let mut ids = IdAllocator::default();
        let mut plan = Vec::new();
        let mut all_ids = Vec::new();
        for finding in findings {
            let id = ids.next_top_level();
            all_ids.push(id.clone());
            plan.push(TodoItem::new(id, format!("apply fix: {}", finding.description), "fix applied and verified".to_string(), 3));
        }

        let restart_id = ids.next_top_level();
        let mut restart_item = TodoItem::new(restart_id, "restart orchestrator process".to_string(), "process restarted cleanly".to_string(), 1);
        restart_item.dependencies = all_ids.into_iter().collect();
        plan.push(restart_item);

        debug!(item_count = plan.len(), "SelfAnalyzer::attempt_intervention: handing off plan to task pipeline");
        Ok(plan)
    }
}

#[derive(Debug, serde::Deserialize)]
struct RawFinding {
    title: String,
    #[serde(default)]
    file_path: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    error_rate: f32,
    #[serde(default)]
    complexity: u8,
}

#[derive(Debug, thiserror::Error)]
pub enum InterventionError {
    #[error("intervention requires a verified password")]
    AuthRequired,
    #[error("no intervention intent detected in the user message")]
    NoInterventionIntent,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(desc: &str, error_rate: f32, complexity: u8) -> Finding {
        Finding { signature: desc.to_string(), error_rate, complexity, description: desc.to_string() }
    }

    #[test]
    fn hierarchical_todo_adds_sub_item_for_deep_findings() {
        let analyzer = SelfAnalyzer::new(Some("mykola".into()), DeepenThresholds { error_rate: 0.3, complexity: 7 });
        let todos = analyzer.build_hierarchical_todo(&[finding("memory leak in executor", 0.8, 8)]);
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0].sub_items.len(), 1);
    }

    #[test]
    fn hierarchical_todo_deepens_down_to_the_configured_cap() {
        let analyzer = SelfAnalyzer::new(Some("mykola".into()), DeepenThresholds { error_rate: 0.3, complexity: 7 });
        let todos = analyzer.build_hierarchical_todo(&[finding("recurring deadlock in scheduler", 0.9, 9)]);

        let mut depth = 0;
        let mut node = &todos[0];
        while let Some(child) = node.sub_items.first() {
            depth += 1;
            node = child;
        }
        assert_eq!(depth, DEFAULT_MAX_DEPTH as usize, "deepening should recurse all the way to the configured cap for a finding that stays above threshold");
    }

    #[test]
    fn hierarchical_todo_skips_sub_item_for_shallow_findings() {
        let analyzer = SelfAnalyzer::new(Some("mykola".into()), DeepenThresholds { error_rate: 0.3, complexity: 7 });
        let todos = analyzer.build_hierarchical_todo(&[finding("minor typo in log message", 0.01, 1)]);
        assert!(todos[0].sub_items.is_empty());
    }

    #[test]
    fn intervention_requires_matching_password() {
        let analyzer = SelfAnalyzer::new(Some("mykola".into()), DeepenThresholds { error_rate: 0.3, complexity: 7 });
        let findings = vec![finding("critical bug", 0.9, 9)];
        let err = analyzer.attempt_intervention(Some("wrong"), "виправ себе", &findings).unwrap_err();
        assert!(matches!(err, InterventionError::AuthRequired));
    }

    #[test]
    fn intervention_requires_intervention_wording() {
        let analyzer = SelfAnalyzer::new(Some("mykola".into()), DeepenThresholds { error_rate: 0.3, complexity: 7 });
        let findings = vec![finding("critical bug", 0.9, 9)];
        let err = analyzer.attempt_intervention(Some("mykola"), "just curious what's wrong", &findings).unwrap_err();
        assert!(matches!(err, InterventionError::NoInterventionIntent));
    }

    #[test]
    fn successful_intervention_ends_with_dependent_restart_step() {
        let analyzer = SelfAnalyzer::new(Some("mykola".into()), DeepenThresholds { error_rate: 0.3, complexity: 7 });
        let findings = vec![finding("critical bug", 0.9, 9)];
        let plan = analyzer.attempt_intervention(Some("mykola"), "виправ себе", &findings).unwrap();
        let restart = plan.last().unwrap();
        assert!(!restart.dependencies.is_empty());
        assert_eq!(restart.dependencies.len(), plan.len() - 1);
    }
}
