//! Error types for MCP registry and invocation

use thiserror::Error;

/// Errors raised while resolving or invoking MCP tools
#[derive(Debug, Error, Clone)]
pub enum McpError {
    #[error("unknown MCP server: {0}")]
    UnknownServer(String),

    #[error("unknown MCP tool: {0}")]
    UnknownTool(String),

    #[error("malformed tool identifier: {0}")]
    MalformedIdentifier(String),

    #[error("transport error calling {server}__{tool}: {message}")]
    Transport {
        server: String,
        tool: String,
        message: String,
    },

    #[error("tool invocation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}
