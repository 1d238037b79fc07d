//! ToolCall / ToolPlan - Stage 2.1 output (`spec.md` 3/4.8)

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub server: String,
    /// Qualified `server__tool` identifier
    pub tool: String,
    pub parameters: Value,
    pub is_long_running: bool,
}

impl ToolCall {
    pub fn new(server: impl Into<String>, tool_name: impl Into<String>, parameters: Value) -> Self {
        let server = server.into();
        let tool_name = tool_name.into();
        Self {
            tool: format!("{server}__{tool_name}"),
            server,
            parameters,
            is_long_running: false,
        }
    }

    pub fn long_running(mut self) -> Self {
        self.is_long_running = true;
        self
    }

    pub fn to_invocation(&self) -> mcpkit::ToolInvocation {
        let bare_tool = self.tool.split_once("__").map(|(_, t)| t.to_string()).unwrap_or_else(|| self.tool.clone());
        mcpkit::ToolInvocation {
            server: self.server.clone(),
            tool: bare_tool,
            parameters: self.parameters.clone(),
        }
    }
}

/// Ordered plan of tool calls for one `TodoItem`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolPlan {
    pub calls: Vec<ToolCall>,
}

impl ToolPlan {
    /// `spec.md` 4.8: "plan has >= 1 call; otherwise stage fails with EmptyPlan"
    pub fn is_empty_plan(&self) -> bool {
        self.calls.is_empty()
    }

    /// `spec.md` 8: every tool server must appear in the item's `ServerSelection`
    pub fn all_servers_selected(&self, selected_servers: &[String]) -> bool {
        self.calls.iter().all(|c| selected_servers.contains(&c.server))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_call_qualifies_name() {
        let call = ToolCall::new("filesystem", "create_directory", serde_json::json!({}));
        assert_eq!(call.tool, "filesystem__create_directory");
    }

    #[test]
    fn empty_plan_is_detected() {
        assert!(ToolPlan::default().is_empty_plan());
    }

    #[test]
    fn all_servers_selected_checks_membership() {
        let plan = ToolPlan {
            calls: vec![ToolCall::new("filesystem", "create_directory", Value::Null)],
        };
        assert!(plan.all_servers_selected(&["filesystem".to_string()]));
        assert!(!plan.all_servers_selected(&["shell".to_string()]));
    }
}
