pub mod client;
pub mod types;

pub use client::McpClient;
pub use types::*;

use crate::config::LaunchSpec;
use crate::error::McpError;
use async_trait::async_trait;
use serde_json::Value;

/// An initialized connection to a tool server.
#[async_trait]
pub trait ToolSession: Send + Sync {
    /// Tools the server advertises
    async fn list_tools(&self) -> Result<Vec<McpTool>, McpError>;

    /// Invoke a tool and return its raw result envelope
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, McpError>;

    /// Terminate the connection and release the server process
    async fn close(&mut self) -> Result<(), McpError>;

    /// True once the transport has ended or the session was closed
    fn is_closed(&self) -> bool;
}

/// Launches a server and performs the protocol handshake.
#[async_trait]
pub trait SessionConnector: Send + Sync {
    async fn connect(&self, spec: &LaunchSpec) -> Result<Box<dyn ToolSession>, McpError>;
}

#[async_trait]
impl ToolSession for McpClient {
    async fn list_tools(&self) -> Result<Vec<McpTool>, McpError> {
        McpClient::list_tools(self).await
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, McpError> {
        McpClient::call_tool(self, name, arguments).await
    }

    async fn close(&mut self) -> Result<(), McpError> {
        McpClient::close(self).await
    }

    fn is_closed(&self) -> bool {
        McpClient::is_closed(self)
    }
}

/// Spawns the server as a child process and talks to it over stdio.
#[derive(Debug, Clone, Default)]
pub struct StdioConnector;

#[async_trait]
impl SessionConnector for StdioConnector {
    async fn connect(&self, spec: &LaunchSpec) -> Result<Box<dyn ToolSession>, McpError> {
        let client = McpClient::spawn("stripe", spec).await?;
        Ok(Box::new(client))
    }
}
