//! ToolExecutor - Stage 2.2 (`spec.md` 4.9)

use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::debug;

use crate::domain::{ExecutionMode, ExecutionReport, StoppedReason, ToolCall, ToolPlan};
use crate::keywords::is_search_scrape_verb;
use mcpkit::McpRegistry;

const LONG_RUNNING_DELAY: Duration = Duration::from_millis(5000);
const GUI_LAUNCH_DELAY: Duration = Duration::from_millis(2000);
const WEB_NAVIGATE_DELAY: Duration = Duration::from_millis(1500);
const WEB_ACTION_DELAY: Duration = Duration::from_millis(800);
const FILESYSTEM_SHELL_DELAY: Duration = Duration::from_millis(200);
const DEFAULT_DELAY: Duration = Duration::from_millis(500);

const WEB_NAVIGATE_TOOLS: &[&str] = &["navigate", "goto", "open_url"];
const WEB_AUTOMATION_SERVERS: &[&str] = &["browser", "web"];
const FILESYSTEM_SHELL_SERVERS: &[&str] = &["filesystem", "shell"];
const GUI_LAUNCH_TOOLS: &[&str] = &["launch_app", "open_app", "start_application"];

pub struct ToolExecutor;

impl ToolExecutor {
    /// `spec.md` 4.9: decide the dispatch mode for one item's plan.
    pub fn decide_mode(plan: &ToolPlan, action: &str, attempt: u32) -> ExecutionMode {
        let distinct_servers: std::collections::HashSet<&str> = plan.calls.iter().map(|c| c.server.as_str()).collect();
        let web_automation_count = plan.calls.iter().filter(|c| WEB_AUTOMATION_SERVERS.contains(&c.server.as_str())).count();

        let forces_step_by_step = web_automation_count > 3 || is_search_scrape_verb(action) || attempt > 1 || distinct_servers.len() > 2;
        if forces_step_by_step {
            return ExecutionMode::StepByStep;
        }

        if Self::is_parallel_safe(plan) {
            ExecutionMode::Parallel
        } else {
            ExecutionMode::Sequential
        }
    }

    /// `spec.md` 4.9: "no call writes a path that a later call reads, and no
    /// call implies stateful browser navigation or working-directory change."
    fn is_parallel_safe(plan: &ToolPlan) -> bool {
        if plan.calls.iter().any(|c| WEB_AUTOMATION_SERVERS.contains(&c.server.as_str()) && Self::is_navigation(c)) {
            return false;
        }

        let mut written_paths: Vec<String> = Vec::new();
        for call in &plan.calls {
            if let Some(path) = call.parameters.get("path").and_then(|v| v.as_str()) {
                if written_paths.iter().any(|p| p == path) {
                    return false;
                }
            }
            if Self::is_write_call(call) {
                if let Some(path) = call.parameters.get("path").and_then(|v| v.as_str()) {
                    written_paths.push(path.to_string());
                }
            }
        }
        true
    }

    fn is_navigation(call: &ToolCall) -> bool {
        WEB_NAVIGATE_TOOLS.iter().any(|t| call.tool.ends_with(t))
    }

    fn is_write_call(call: &ToolCall) -> bool {
        ["write", "create", "delete", "remove", "move", "rename"].iter().any(|verb| call.tool.contains(verb))
    }

    fn delay_for(call: &ToolCall) -> Duration {
        if call.is_long_running {
            LONG_RUNNING_DELAY
        } else if GUI_LAUNCH_TOOLS.iter().any(|t| call.tool.ends_with(t)) {
            GUI_LAUNCH_DELAY
        } else if Self::is_navigation(call) {
            WEB_NAVIGATE_DELAY
        } else if WEB_AUTOMATION_SERVERS.contains(&call.server.as_str()) {
            WEB_ACTION_DELAY
        } else if FILESYSTEM_SHELL_SERVERS.contains(&call.server.as_str()) {
            FILESYSTEM_SHELL_DELAY
        } else {
            DEFAULT_DELAY
        }
    }

    pub async fn execute(registry: &McpRegistry, plan: &ToolPlan, mode: ExecutionMode) -> ExecutionReport {
        debug!(calls = plan.calls.len(), ?mode, "ToolExecutor::execute: called");
        let started = Instant::now();
        match mode {
            ExecutionMode::Parallel => Self::execute_parallel(registry, plan, started).await,
            ExecutionMode::Sequential => Self::execute_sequential(registry, plan, started, false).await,
            ExecutionMode::StepByStep => Self::execute_sequential(registry, plan, started, true).await,
        }
    }

    async fn execute_parallel(registry: &McpRegistry, plan: &ToolPlan, started: Instant) -> ExecutionReport {
        let pending = plan.calls.iter().map(|call| registry.invoke(&call.to_invocation()));
        let results = futures::future::join_all(pending).await;
        ExecutionReport::from_results(results, ExecutionMode::Parallel, started.elapsed().as_millis() as u64)
    }

    async fn execute_sequential(registry: &McpRegistry, plan: &ToolPlan, started: Instant, stop_at_first_failure: bool) -> ExecutionReport {
        let mut results = Vec::with_capacity(plan.calls.len());
        let mut stopped_at = None;

        for (index, call) in plan.calls.iter().enumerate() {
            let result = registry.invoke(&call.to_invocation()).await;
            let failed = !result.success;
            results.push(result);

            if failed && stop_at_first_failure {
                stopped_at = Some(index);
                break;
            }

            if index + 1 < plan.calls.len() && !failed {
                sleep(Self::delay_for(call)).await;
            }
        }

        let mode = if stop_at_first_failure { ExecutionMode::StepByStep } else { ExecutionMode::Sequential };
        let report = ExecutionReport::from_results(results, mode, started.elapsed().as_millis() as u64);
        match stopped_at {
            Some(index) => report.stopped_at(index, StoppedReason::FirstFailure),
            None => report,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcpkit::{MockTransport, ServerDescriptor, ToolDescriptor};
    use std::sync::Arc;

    #[test]
    fn more_than_two_servers_forces_step_by_step() {
        let plan = ToolPlan {
            calls: vec![
                ToolCall::new("filesystem", "write", serde_json::Value::Null),
                ToolCall::new("shell", "run", serde_json::Value::Null),
                ToolCall::new("browser", "navigate", serde_json::Value::Null),
            ],
        };
        assert_eq!(ToolExecutor::decide_mode(&plan, "do things", 1), ExecutionMode::StepByStep);
    }

    #[test]
    fn retry_attempt_forces_step_by_step() {
        let plan = ToolPlan { calls: vec![ToolCall::new("filesystem", "write", serde_json::Value::Null)] };
        assert_eq!(ToolExecutor::decide_mode(&plan, "write a file", 2), ExecutionMode::StepByStep);
    }

    #[test]
    fn independent_calls_are_parallel() {
        let plan = ToolPlan {
            calls: vec![
                ToolCall::new("filesystem", "create_directory", serde_json::json!({"path": "/tmp/a"})),
                ToolCall::new("filesystem", "create_directory", serde_json::json!({"path": "/tmp/b"})),
            ],
        };
        assert_eq!(ToolExecutor::decide_mode(&plan, "create two folders", 1), ExecutionMode::Parallel);
    }

    #[test]
    fn navigation_call_is_not_parallel_safe() {
        let plan = ToolPlan {
            calls: vec![
                ToolCall::new("browser", "navigate", serde_json::json!({"url": "https://example.com"})),
                ToolCall::new("browser", "click", serde_json::json!({"selector": "#go"})),
            ],
        };
        assert_eq!(ToolExecutor::decide_mode(&plan, "go to the page and click", 1), ExecutionMode::Sequential);
    }

    #[tokio::test]
    async fn parallel_execution_aggregates_all_results() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response("filesystem", "create_directory", Ok(serde_json::json!({"ok": true})));
        transport.push_response("filesystem", "create_directory", Ok(serde_json::json!({"ok": true})));
        let mut registry = McpRegistry::new(transport);
        registry.register_server(ServerDescriptor {
            name: "filesystem".to_string(),
            tools: vec![ToolDescriptor { name: "create_directory".to_string(), description: String::new(), input_schema: serde_json::Value::Null }],
        });

        let plan = ToolPlan {
            calls: vec![
                ToolCall::new("filesystem", "create_directory", serde_json::json!({"path": "/tmp/a"})),
                ToolCall::new("filesystem", "create_directory", serde_json::json!({"path": "/tmp/b"})),
            ],
        };
        let report = ToolExecutor::execute(&registry, &plan, ExecutionMode::Parallel).await;
        assert!(report.all_successful);
        assert_eq!(report.successful_count, 2);
    }

    #[tokio::test]
    async fn step_by_step_stops_at_first_failure() {
        let transport = Arc::new(MockTransport::new());
        // registry retry_policy defaults to 2 attempts; both must fail for
        // the first call to end in a genuine failure.
        for _ in 0..2 {
            transport.push_response(
                "filesystem",
                "create_directory",
                Err(mcpkit::McpError::Transport { server: "filesystem".into(), tool: "create_directory".into(), message: "boom".into() }),
            );
        }
        transport.push_response("filesystem", "create_directory", Ok(serde_json::json!({"ok": true})));
        let mut registry = McpRegistry::new(transport);
        registry.register_server(ServerDescriptor {
            name: "filesystem".to_string(),
            tools: vec![ToolDescriptor { name: "create_directory".to_string(), description: String::new(), input_schema: serde_json::Value::Null }],
        });

        let plan = ToolPlan {
            calls: vec![
                ToolCall::new("filesystem", "create_directory", serde_json::json!({"path": "/tmp/a"})),
                ToolCall::new("filesystem", "create_directory", serde_json::json!({"path": "/tmp/b"})),
            ],
        };
        let report = ToolExecutor::execute(&registry, &plan, ExecutionMode::StepByStep).await;
        assert_eq!(report.stopped_at_index, Some(0));
        assert_eq!(report.stopped_reason, Some(StoppedReason::FirstFailure));
        assert_eq!(report.results.len(), 1);
    }
}
