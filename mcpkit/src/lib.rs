//! mcpkit - registry and invocation surface for Model-Context-Protocol servers
//!
//! An MCP server is an external process exposing named tools callable by
//! name + JSON arguments. The actual wire transport (stdio JSON-RPC, a
//! socket, whatever) is an external collaborator: this crate only models
//! the `McpTransport` seam plus the bookkeeping around it (qualified tool
//! identifiers, server/tool enumeration, retry policy).

#![allow(dead_code)]

mod error;
mod policy;
mod registry;
mod transport;
mod types;

pub use error::McpError;
pub use policy::RetryPolicy;
pub use registry::McpRegistry;
pub use transport::{McpTransport, MockTransport};
pub use types::{ServerDescriptor, ToolDescriptor, ToolInvocation, ToolInvocationResult};
