//! Scripted stand-ins for the MCP connection used by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stripe_mcp_client::mcp::{CallToolResult, McpTool, SessionConnector, ToolSession};
use stripe_mcp_client::{ClientOptions, LaunchSpec, McpError, SessionConfig, StripeMcpClient};

pub const PAYMENT_LINK_JSON: &str = r#"{"id":"plink_1234","object":"payment_link","url":"https://checkout.stripe.com/pay/cs_test_123456789","created":1612312000}"#;

/// Everything the mock observed.
#[derive(Default)]
pub struct Recorder {
    pub connects: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub closes: AtomicUsize,
    // Set to simulate the server process dying under a live session.
    pub transport_dead: AtomicBool,
    pub specs: Mutex<Vec<LaunchSpec>>,
    pub calls: Mutex<Vec<(String, Value)>>,
}

impl Recorder {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn kill_transport(&self) {
        self.transport_dead.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn specs(&self) -> Vec<LaunchSpec> {
        self.specs.lock().unwrap().clone()
    }
}

#[derive(Clone)]
pub enum Reply {
    Result(CallToolResult),
    RpcError(String),
}

#[derive(Clone)]
pub struct MockConnector {
    pub recorder: Arc<Recorder>,
    pub reply: Reply,
    pub fail_connect: bool,
    pub fail_list: bool,
    pub fail_close: bool,
    pub connect_delay: Option<Duration>,
    pub call_delay: Option<Duration>,
}

impl MockConnector {
    pub fn replying(reply: CallToolResult) -> Self {
        Self {
            recorder: Arc::new(Recorder::default()),
            reply: Reply::Result(reply),
            fail_connect: false,
            fail_list: false,
            fail_close: false,
            connect_delay: None,
            call_delay: None,
        }
    }

    pub fn payment_link() -> Self {
        Self::replying(CallToolResult::text(PAYMENT_LINK_JSON))
    }
}

#[async_trait]
impl SessionConnector for MockConnector {
    async fn connect(&self, spec: &LaunchSpec) -> Result<Box<dyn ToolSession>, McpError> {
        self.recorder.connects.fetch_add(1, Ordering::SeqCst);
        self.recorder.specs.lock().unwrap().push(spec.clone());

        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_connect {
            return Err(McpError::Spawn {
                command: spec.command.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            });
        }

        self.recorder.transport_dead.store(false, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            recorder: Arc::clone(&self.recorder),
            reply: self.reply.clone(),
            fail_list: self.fail_list,
            fail_close: self.fail_close,
            call_delay: self.call_delay,
        }))
    }
}

pub struct MockSession {
    recorder: Arc<Recorder>,
    reply: Reply,
    fail_list: bool,
    fail_close: bool,
    call_delay: Option<Duration>,
}

#[async_trait]
impl ToolSession for MockSession {
    async fn list_tools(&self) -> Result<Vec<McpTool>, McpError> {
        self.recorder.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list {
            return Err(McpError::Rpc {
                code: -32601,
                message: "Method not found".to_string(),
            });
        }
        Ok(vec![McpTool {
            name: "paymentLinks.create".to_string(),
            description: None,
            input_schema: Value::Null,
        }])
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, McpError> {
        self.recorder
            .calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments));

        if let Some(delay) = self.call_delay {
            tokio::time::sleep(delay).await;
        }

        match &self.reply {
            Reply::Result(result) => Ok(result.clone()),
            Reply::RpcError(message) => Err(McpError::Rpc {
                code: -32000,
                message: message.clone(),
            }),
        }
    }

    async fn close(&mut self) -> Result<(), McpError> {
        self.recorder.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(McpError::ConnectionClosed);
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.recorder.transport_dead.load(Ordering::SeqCst)
    }
}

pub fn session_config(options: ClientOptions) -> SessionConfig {
    SessionConfig::resolve_with(options, |_| None).unwrap()
}

pub fn test_options() -> ClientOptions {
    ClientOptions {
        api_key: Some("sk_test_abc".to_string()),
        ..Default::default()
    }
}

pub fn client_with(connector: MockConnector, debug: bool) -> StripeMcpClient {
    let options = ClientOptions {
        debug,
        ..test_options()
    };
    StripeMcpClient::with_connector(session_config(options), connector)
}
