//! Domain types for MCP servers, tools, and invocations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool exposed by an MCP server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Bare tool name, e.g. "create_directory"
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// A registered MCP server and the tools it exposes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerDescriptor {
    pub name: String,
    pub tools: Vec<ToolDescriptor>,
}

impl ServerDescriptor {
    pub fn has_tool(&self, tool_name: &str) -> bool {
        self.tools.iter().any(|t| t.name == tool_name)
    }
}

/// One fully-resolved tool invocation: `server__tool` plus arguments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub server: String,
    pub tool: String,
    pub parameters: Value,
}

impl ToolInvocation {
    /// The qualified identifier `server__tool`
    pub fn qualified_name(&self) -> String {
        format!("{}__{}", self.server, self.tool)
    }
}

/// Outcome of invoking a tool through the registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocationResult {
    pub success: bool,
    pub tool: String,
    pub data: Option<Value>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub metadata: Value,
}

impl ToolInvocationResult {
    pub fn ok(tool: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            tool: tool.into(),
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
            metadata: Value::Null,
        }
    }

    pub fn failed(tool: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            tool: tool.into(),
            data: None,
            error: Some(error.into()),
            timestamp: Utc::now(),
            metadata: Value::Null,
        }
    }
}
