//! McpTransport - the external collaborator seam
//!
//! The actual wire protocol to an MCP server (spawn a process, speak
//! stdio JSON-RPC, or connect to a socket) is out of scope for this
//! system (`spec.md` 1 "Out of scope"). `McpTransport` is the interface a
//! concrete transport implements; `McpRegistry` only ever talks to this
//! trait, mirroring how the teacher's `LoopEngine` only ever talks to the
//! `LlmClient` trait rather than a concrete HTTP client.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

use super::error::McpError;

/// A transport capable of invoking a named tool on a named MCP server
#[async_trait]
pub trait McpTransport: Send + Sync {
    async fn invoke(&self, server: &str, tool: &str, parameters: Value) -> Result<Value, McpError>;
}

/// In-memory transport used by tests and by callers wiring up fixtures
/// before a real transport is available. Returns scripted responses in
/// call order, per `server__tool` key.
pub struct MockTransport {
    responses: Mutex<HashMap<String, Vec<Result<Value, McpError>>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
        }
    }

    /// Queue a response for a given `server__tool` key; calls drain in FIFO order
    pub fn push_response(&self, server: &str, tool: &str, response: Result<Value, McpError>) {
        let key = format!("{}__{}", server, tool);
        debug!(%key, "MockTransport::push_response: called");
        self.responses.lock().unwrap().entry(key).or_default().push(response);
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl McpTransport for MockTransport {
    async fn invoke(&self, server: &str, tool: &str, _parameters: Value) -> Result<Value, McpError> {
        let key = format!("{}__{}", server, tool);
        debug!(%key, "MockTransport::invoke: called");
        let mut guard = self.responses.lock().unwrap();
        match guard.get_mut(&key).and_then(|queue| if queue.is_empty() { None } else { Some(queue.remove(0)) }) {
            Some(result) => result,
            None => Ok(Value::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_transport_drains_fifo() {
        let transport = MockTransport::new();
        transport.push_response("filesystem", "get_file_info", Ok(serde_json::json!({"exists": true})));
        transport.push_response("filesystem", "get_file_info", Ok(serde_json::json!({"exists": false})));

        let first = transport.invoke("filesystem", "get_file_info", Value::Null).await.unwrap();
        assert_eq!(first["exists"], true);
        let second = transport.invoke("filesystem", "get_file_info", Value::Null).await.unwrap();
        assert_eq!(second["exists"], false);
    }

    #[tokio::test]
    async fn mock_transport_defaults_to_null() {
        let transport = MockTransport::new();
        let result = transport.invoke("filesystem", "unscripted", Value::Null).await.unwrap();
        assert_eq!(result, Value::Null);
    }
}
