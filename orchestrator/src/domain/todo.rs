//! TodoItem - atomic unit of work (`spec.md` 3)

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::execution::ToolResult;
use super::verification::Verification;

/// Lifecycle status of a `TodoItem`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
    NeedsReview,
    Abandoned,
}

impl TodoStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Abandoned)
    }
}

/// Atomic unit of work produced by `TodoPlanner` or `Replanner`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoItem {
    /// Hierarchical identifier "a" or "a.b.c"
    pub id: String,
    pub action: String,
    pub success_criteria: String,
    /// Suggested servers from planning; must be <= 2 or the item needs splitting
    pub suggested_servers: HashSet<String>,
    /// Persisted selection after Stage 2.0, empty until `ServerSelector` runs
    pub mcp_servers: Vec<String>,
    pub parameters: HashMap<String, Value>,
    pub max_attempts: u32,
    pub attempt: u32,
    pub dependencies: HashSet<String>,
    pub status: TodoStatus,
    pub sub_items: Vec<TodoItem>,
    pub execution_results: Vec<ToolResult>,
    pub verification: Option<Verification>,
}

impl TodoItem {
    pub fn new(id: impl Into<String>, action: impl Into<String>, success_criteria: impl Into<String>, max_attempts: u32) -> Self {
        let id = id.into();
        debug!(%id, "TodoItem::new: called");
        Self {
            id,
            action: action.into(),
            success_criteria: success_criteria.into(),
            suggested_servers: HashSet::new(),
            mcp_servers: Vec::new(),
            parameters: HashMap::new(),
            max_attempts,
            attempt: 0,
            dependencies: HashSet::new(),
            status: TodoStatus::Pending,
            sub_items: Vec::new(),
            execution_results: Vec::new(),
            verification: None,
        }
    }

    /// Invariant: attempt <= max_attempts
    pub fn attempts_exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }

    /// A completed item has a verification with verified=true OR a verified
    /// data check (`spec.md` 3 invariant)
    pub fn invariant_holds(&self) -> bool {
        let attempt_ok = self.attempt <= self.max_attempts;
        let completion_ok = if self.status == TodoStatus::Completed {
            self.verification.as_ref().map(|v| v.verified).unwrap_or(false)
        } else {
            true
        };
        attempt_ok && completion_ok
    }

    pub fn record_attempt(&mut self) {
        self.attempt += 1;
    }

    pub fn mark_completed(&mut self, verification: Verification) {
        debug!(id = %self.id, "TodoItem::mark_completed: called");
        self.verification = Some(verification);
        self.status = TodoStatus::Completed;
    }

    pub fn mark_abandoned(&mut self, verification: Verification) {
        debug!(id = %self.id, "TodoItem::mark_abandoned: called");
        self.verification = Some(verification);
        self.status = TodoStatus::Abandoned;
    }

    pub fn needs_split(&self) -> bool {
        self.suggested_servers.len() > 2
    }
}
