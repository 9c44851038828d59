//! Minimal MCP server ("Payment Server") exposing `create_checkout_link`.
//!
//! Speaks newline-delimited JSON-RPC 2.0 on any reader/writer pair. Each tool
//! call gets a fresh [`StripeMcpClient`] from the factory, which is closed
//! before the result is returned.

use crate::checkout::{
    failure_result, run_checkout_tool, CheckoutLinkArgs, CHECKOUT_TOOL_DESCRIPTION,
    CHECKOUT_TOOL_NAME,
};
use crate::error::Result;
use crate::mcp::types::*;
use crate::stripe::StripeMcpClient;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

pub const SERVER_NAME: &str = "Payment Server";

pub struct PaymentServer<F> {
    client_factory: F,
}

impl<F> PaymentServer<F>
where
    F: Fn() -> Result<StripeMcpClient> + Send + Sync,
{
    pub fn new(client_factory: F) -> Self {
        Self { client_factory }
    }

    pub fn tools() -> Vec<McpTool> {
        vec![McpTool {
            name: CHECKOUT_TOOL_NAME.to_string(),
            description: Some(CHECKOUT_TOOL_DESCRIPTION.to_string()),
            input_schema: CheckoutLinkArgs::input_schema(),
        }]
    }

    /// Serve requests until `reader` reaches EOF.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!("{} started", SERVER_NAME);
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<JsonRpcRequest>(&line) {
                Ok(request) => self.handle(request).await,
                Err(e) => {
                    warn!("Unparseable request: {}", e);
                    Some(JsonRpcResponse::failure(
                        Value::Null,
                        PARSE_ERROR,
                        format!("Parse error: {}", e),
                    ))
                }
            };

            if let Some(response) = response {
                let mut out = serde_json::to_string(&response)?;
                out.push('\n');
                writer.write_all(out.as_bytes()).await?;
                writer.flush().await?;
            }
        }

        info!("{} input closed, shutting down", SERVER_NAME);
        Ok(())
    }

    /// Handle one message. Notifications get no response.
    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!("Handling '{}'", request.method);

        let id = match request.id {
            Some(id) => id,
            None => {
                debug!("Notification '{}' ignored", request.method);
                return None;
            }
        };

        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, initialize_result()),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => match serde_json::to_value(ListToolsResult {
                tools: Self::tools(),
            }) {
                Ok(result) => JsonRpcResponse::success(id, result),
                Err(e) => JsonRpcResponse::failure(id, INTERNAL_ERROR, e.to_string()),
            },
            "tools/call" => self.call_tool(id, request.params).await,
            other => JsonRpcResponse::failure(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {}", other),
            ),
        };

        Some(response)
    }

    async fn call_tool(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let params: CallToolParams = match serde_json::from_value(params.unwrap_or(Value::Null)) {
            Ok(params) => params,
            Err(e) => return JsonRpcResponse::failure(id, INVALID_PARAMS, e.to_string()),
        };

        if params.name != CHECKOUT_TOOL_NAME {
            return JsonRpcResponse::failure(
                id,
                INVALID_PARAMS,
                format!("Unknown tool: {}", params.name),
            );
        }

        let args: CheckoutLinkArgs = match serde_json::from_value(params.arguments) {
            Ok(args) => args,
            Err(e) => {
                return JsonRpcResponse::failure(
                    id,
                    INVALID_PARAMS,
                    format!("Invalid arguments for {}: {}", CHECKOUT_TOOL_NAME, e),
                )
            }
        };

        let result = match (self.client_factory)() {
            Ok(client) => run_checkout_tool(&client, &args).await,
            Err(e) => failure_result(&e),
        };

        match serde_json::to_value(result) {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => JsonRpcResponse::failure(id, INTERNAL_ERROR, e.to_string()),
        }
    }
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": MCP_VERSION,
        "capabilities": { "tools": {} },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        }
    })
}
