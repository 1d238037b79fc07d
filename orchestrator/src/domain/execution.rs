//! ToolResult / ExecutionReport - Stage 2.2 output (`spec.md` 3/4.9)

use serde::{Deserialize, Serialize};

/// Result of a single tool invocation. Identical in shape to
/// `mcpkit::ToolInvocationResult`; re-exported under the orchestrator's own
/// domain vocabulary since the pipeline's data model (`spec.md` 3) names it
/// independently of the MCP registry's own types.
pub type ToolResult = mcpkit::ToolInvocationResult;

/// Dispatch mode chosen by `ToolExecutor` (`spec.md` 4.9)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Parallel,
    Sequential,
    StepByStep,
}

/// Why a step-by-step run stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoppedReason {
    FirstFailure,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub all_successful: bool,
    pub successful_count: usize,
    pub failed_count: usize,
    pub results: Vec<ToolResult>,
    pub execution_time_ms: u64,
    pub mode: ExecutionMode,
    pub stopped_at_index: Option<usize>,
    pub stopped_reason: Option<StoppedReason>,
}

impl ExecutionReport {
    pub fn from_results(results: Vec<ToolResult>, mode: ExecutionMode, execution_time_ms: u64) -> Self {
        let successful_count = results.iter().filter(|r| r.success).count();
        let failed_count = results.len() - successful_count;
        Self {
            all_successful: failed_count == 0,
            successful_count,
            failed_count,
            results,
            execution_time_ms,
            mode,
            stopped_at_index: None,
            stopped_reason: None,
        }
    }

    pub fn stopped_at(mut self, index: usize, reason: StoppedReason) -> Self {
        self.stopped_at_index = Some(index);
        self.stopped_reason = Some(reason);
        self
    }

    /// `spec.md` 8: for parallel mode, `len(results) == len(plan)` and
    /// `results[i].tool == plan[i].tool`, checked against the originating plan.
    pub fn matches_plan_order(&self, plan: &super::tool::ToolPlan) -> bool {
        self.results.len() == plan.calls.len() && self.results.iter().zip(plan.calls.iter()).all(|(r, c)| r.tool == c.tool)
    }
}
