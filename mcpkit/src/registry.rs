//! McpRegistry - enumerates known MCP servers/tools and invokes them

use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::OnceLock;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::error::McpError;
use super::policy::{RetryPolicy, RetryableKind};
use super::transport::McpTransport;
use super::types::{ServerDescriptor, ToolDescriptor, ToolInvocation, ToolInvocationResult};

fn qualified_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z_]+__[a-z0-9_]+$").expect("static regex"))
}

/// Registry of known MCP servers, backed by a transport for invocation
pub struct McpRegistry {
    servers: HashMap<String, ServerDescriptor>,
    transport: Arc<dyn McpTransport>,
    retry_policy: RetryPolicy,
}

impl McpRegistry {
    pub fn new(transport: Arc<dyn McpTransport>) -> Self {
        Self::with_policy(transport, RetryPolicy::default())
    }

    pub fn with_policy(transport: Arc<dyn McpTransport>, retry_policy: RetryPolicy) -> Self {
        debug!("McpRegistry::with_policy: called");
        Self {
            servers: HashMap::new(),
            transport,
            retry_policy,
        }
    }

    /// Register a server and the tools it exposes
    pub fn register_server(&mut self, server: ServerDescriptor) {
        debug!(server = %server.name, tool_count = server.tools.len(), "McpRegistry::register_server: called");
        self.servers.insert(server.name.clone(), server);
    }

    pub fn known_servers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.servers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn server(&self, name: &str) -> Option<&ServerDescriptor> {
        self.servers.get(name)
    }

    pub fn is_known_server(&self, name: &str) -> bool {
        self.servers.contains_key(name)
    }

    /// Resolve an identifier into a fully-qualified `server__tool` invocation.
    ///
    /// - An already-qualified identifier (`server__tool`) is validated against
    ///   the grammar and checked for a known server/tool pair.
    /// - An unqualified identifier is auto-qualified by prepending `server`,
    ///   provided `server` is known; otherwise it is a hard error.
    pub fn resolve(&self, identifier: &str, server_hint: Option<&str>, parameters: Value) -> Result<ToolInvocation, McpError> {
        debug!(%identifier, ?server_hint, "McpRegistry::resolve: called");
        if identifier.contains("__") {
            if !qualified_name_re().is_match(identifier) {
                return Err(McpError::MalformedIdentifier(identifier.to_string()));
            }
            let (server, tool) = identifier.split_once("__").expect("contains __");
            self.validate_known(server, tool)?;
            return Ok(ToolInvocation {
                server: server.to_string(),
                tool: tool.to_string(),
                parameters,
            });
        }

        let server = server_hint.ok_or_else(|| McpError::MalformedIdentifier(identifier.to_string()))?;
        if !self.is_known_server(server) {
            return Err(McpError::UnknownServer(server.to_string()));
        }
        self.validate_known(server, identifier)?;
        Ok(ToolInvocation {
            server: server.to_string(),
            tool: identifier.to_string(),
            parameters,
        })
    }

    fn validate_known(&self, server: &str, tool: &str) -> Result<(), McpError> {
        let descriptor = self.servers.get(server).ok_or_else(|| McpError::UnknownServer(server.to_string()))?;
        if !descriptor.has_tool(tool) {
            return Err(McpError::UnknownTool(format!("{}__{}", server, tool)));
        }
        Ok(())
    }

    /// Invoke a resolved tool call, retrying transient failures per policy.
    pub async fn invoke(&self, invocation: &ToolInvocation) -> ToolInvocationResult {
        let qualified = invocation.qualified_name();
        debug!(tool = %qualified, "McpRegistry::invoke: called");

        let mut last_err: Option<McpError> = None;
        for attempt in 0..self.retry_policy.max_attempts {
            match self
                .transport
                .invoke(&invocation.server, &invocation.tool, invocation.parameters.clone())
                .await
            {
                Ok(data) => return ToolInvocationResult::ok(qualified, data),
                Err(err) => {
                    let retryable = matches!(err, McpError::Transport { .. })
                        && self.retry_policy.retryable_kinds.contains(&RetryableKind::Transport)
                        || matches!(err, McpError::Timeout { .. }) && self.retry_policy.retryable_kinds.contains(&RetryableKind::Timeout);
                    warn!(tool = %qualified, attempt, %err, retryable, "McpRegistry::invoke: tool call failed");
                    last_err = Some(err);
                    if !retryable || attempt + 1 >= self.retry_policy.max_attempts {
                        break;
                    }
                    sleep(self.retry_policy.delay_for_attempt(attempt)).await;
                }
            }
        }

        ToolInvocationResult::failed(qualified, last_err.map(|e| e.to_string()).unwrap_or_else(|| "unknown error".into()))
    }

    /// List tool descriptors for a subset of servers (used by ToolPlanner prompts)
    pub fn descriptors_for(&self, servers: &[String]) -> Vec<&ToolDescriptor> {
        servers
            .iter()
            .filter_map(|name| self.servers.get(name))
            .flat_map(|s| s.tools.iter())
            .collect()
    }
}
