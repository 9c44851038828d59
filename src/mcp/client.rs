use super::types::*;
use crate::config::LaunchSpec;
use crate::error::McpError;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// MCP server connection over a pair of byte streams, usually a child's stdio.
pub struct McpClient {
    name: String,
    child: Option<Child>,
    writer: Mutex<Writer>,
    pending: PendingMap,
    closed: Arc<AtomicBool>,
    request_id: AtomicU64,
    reader_task: JoinHandle<()>,
    server_info: Option<Implementation>,
}

impl McpClient {
    /// Start an MCP server process and complete the handshake.
    ///
    /// The child is killed if the handshake fails.
    pub async fn spawn(name: impl Into<String>, spec: &LaunchSpec) -> Result<Self, McpError> {
        let name = name.into();
        info!("Starting MCP server '{}': {:?}", name, spec);

        let mut child = Command::new(&spec.command)
            .args(&spec.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| McpError::Spawn {
                command: spec.command.clone(),
                source,
            })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            McpError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                format!("no stdin for MCP server '{}'", name),
            ))
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            McpError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                format!("no stdout for MCP server '{}'", name),
            ))
        })?;

        let mut client = Self::attach(name, stdout, stdin, Some(child));
        client.initialize().await?;
        Ok(client)
    }

    /// Attach to an already running server and complete the handshake.
    pub async fn start<R, W>(name: impl Into<String>, reader: R, writer: W) -> Result<Self, McpError>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let mut client = Self::attach(name.into(), reader, writer, None);
        client.initialize().await?;
        Ok(client)
    }

    fn attach<R, W>(name: String, reader: R, writer: W, child: Option<Child>) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));

        let reader_task = tokio::spawn(read_responses(
            name.clone(),
            reader,
            Arc::clone(&pending),
            Arc::clone(&closed),
        ));

        Self {
            name,
            child,
            writer: Mutex::new(Box::new(writer)),
            pending,
            closed,
            request_id: AtomicU64::new(1),
            reader_task,
            server_info: None,
        }
    }

    async fn initialize(&mut self) -> Result<(), McpError> {
        debug!("Initializing MCP server '{}'", self.name);

        let params = InitializeParams {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: json!({}),
            client_info: Implementation {
                name: "stripe-mcp-client".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        let response = self
            .request("initialize", Some(serde_json::to_value(params)?))
            .await?;
        let result: InitializeResult = serde_json::from_value(response)?;

        info!(
            "MCP server '{}' initialized: {} v{}",
            self.name, result.server_info.name, result.server_info.version
        );
        self.server_info = Some(result.server_info);

        self.send(&JsonRpcRequest::notification("notifications/initialized", None))
            .await
    }

    /// List available tools from the server
    pub async fn list_tools(&self) -> Result<Vec<McpTool>, McpError> {
        let response = self.request("tools/list", None).await?;
        let result: ListToolsResult = serde_json::from_value(response)?;
        debug!("MCP server '{}' has {} tools", self.name, result.tools.len());
        Ok(result.tools)
    }

    /// Call a tool on the MCP server
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, McpError> {
        debug!("Calling tool '{}' on MCP server '{}'", name, self.name);

        let params = CallToolParams {
            name: name.to_string(),
            arguments,
        };
        let response = self
            .request("tools/call", Some(serde_json::to_value(params)?))
            .await?;

        Ok(serde_json::from_value(response)?)
    }

    /// Stop the reader, close stdin and kill the server process.
    pub async fn close(&mut self) -> Result<(), McpError> {
        debug!("Closing MCP server '{}'", self.name);

        self.closed.store(true, Ordering::SeqCst);
        self.reader_task.abort();
        self.pending.lock().await.clear();

        if let Err(e) = self.writer.lock().await.shutdown().await {
            debug!("Failed to close stdin of MCP server '{}': {}", self.name, e);
        }

        if let Some(mut child) = self.child.take() {
            child.kill().await?;
        }

        Ok(())
    }

    /// Send a JSON-RPC request and wait for the matching response
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, McpError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();

        {
            let mut pending = self.pending.lock().await;
            if self.closed.load(Ordering::SeqCst) {
                return Err(McpError::ConnectionClosed);
            }
            pending.insert(id, tx);
        }

        if let Err(e) = self.send(&JsonRpcRequest::new(id, method, params)).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        let response = rx.await.map_err(|_| McpError::ConnectionClosed)?;

        if let Some(error) = response.error {
            return Err(McpError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        response
            .result
            .ok_or_else(|| McpError::MissingResult(method.to_string()))
    }

    async fn send(&self, message: &JsonRpcRequest) -> Result<(), McpError> {
        let mut line = serde_json::to_string(message)?;
        line.push('\n');

        debug!("Sending '{}' to MCP server '{}'", message.method, self.name);

        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    /// True once the server's output stream ended or [`McpClient::close`] ran.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn server_info(&self) -> Option<&Implementation> {
        self.server_info.as_ref()
    }
}

impl Drop for McpClient {
    fn drop(&mut self) {
        debug!("Shutting down MCP server '{}'", self.name);
        self.reader_task.abort();
    }
}

/// Route each response line to the request waiting on its id.
///
/// When the stream ends every pending request is dropped, which wakes its
/// caller with `ConnectionClosed`.
async fn read_responses<R>(name: String, reader: R, pending: PendingMap, closed: Arc<AtomicBool>)
where
    R: AsyncRead + Send + Unpin + 'static,
{
    let mut lines = BufReader::new(reader).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read from MCP server '{}': {}", name, e);
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let message: Value = match serde_json::from_str(&line) {
            Ok(message) => message,
            Err(e) => {
                warn!("Ignoring non JSON-RPC output from '{}': {}", name, e);
                continue;
            }
        };

        if message.get("method").is_some() {
            debug!("Ignoring server-initiated message from '{}': {}", name, line);
            continue;
        }

        let response: JsonRpcResponse = match serde_json::from_value(message) {
            Ok(response) => response,
            Err(e) => {
                warn!("Malformed JSON-RPC response from '{}': {}", name, e);
                continue;
            }
        };

        match response.id.as_u64() {
            Some(id) => {
                if let Some(tx) = pending.lock().await.remove(&id) {
                    let _ = tx.send(response);
                } else {
                    debug!("No pending request {} on '{}'", id, name);
                }
            }
            None => warn!("Response from '{}' has a non-numeric id", name),
        }
    }

    debug!("MCP server '{}' stream ended", name);
    closed.store(true, Ordering::SeqCst);
    pending.lock().await.clear();
}
