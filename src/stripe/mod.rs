//! Session manager for Stripe's MCP server.
//!
//! [`StripeMcpClient`] owns at most one server process. It connects lazily,
//! forwards payment link requests to the `paymentLinks.create` tool and
//! releases the process on [`StripeMcpClient::close`].

pub mod response;

pub use response::{PaymentLink, PaymentLinkResponse, RAW_RESPONSE_KEY};

use crate::config::{ClientOptions, SessionConfig};
use crate::error::{McpError, Result, StripeMcpError};
use crate::mcp::{McpTool, SessionConnector, StdioConnector, ToolSession};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Tool invoked by [`StripeMcpClient::create_payment_link`].
pub const PAYMENT_LINKS_CREATE: &str = "paymentLinks.create";

pub struct StripeMcpClient {
    config: SessionConfig,
    connector: Box<dyn SessionConnector>,
    // Held across connect so concurrent first use spawns a single server.
    session: Mutex<Option<Box<dyn ToolSession>>>,
    // Last known state, answered while a call holds `session`.
    connected: AtomicBool,
}

impl StripeMcpClient {
    /// Create a client, resolving the API key from `options` or `STRIPE_API_KEY`.
    pub fn new(options: ClientOptions) -> Result<Self> {
        Ok(Self::from_config(SessionConfig::resolve(options)?))
    }

    /// Create a client that launches the server over stdio.
    pub fn from_config(config: SessionConfig) -> Self {
        Self::with_connector(config, StdioConnector)
    }

    /// Create a client with a custom connector.
    pub fn with_connector(config: SessionConfig, connector: impl SessionConnector + 'static) -> Self {
        Self {
            config,
            connector: Box::new(connector),
            session: Mutex::new(None),
            connected: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Whether a live session exists. Never waits for an in-flight call.
    ///
    /// A session whose transport has died counts as disconnected.
    pub fn is_connected(&self) -> bool {
        match self.session.try_lock() {
            Ok(slot) => slot.as_ref().is_some_and(|session| !session.is_closed()),
            Err(_) => self.connected.load(Ordering::SeqCst),
        }
    }

    /// Connect to the Stripe MCP server. Does nothing when already connected.
    pub async fn connect(&self) -> Result<()> {
        let mut slot = self.session.lock().await;
        self.connect_locked(&mut slot).await
    }

    async fn connect_locked(&self, slot: &mut Option<Box<dyn ToolSession>>) -> Result<()> {
        if let Some(session) = slot.as_mut() {
            if !session.is_closed() {
                return Ok(());
            }

            warn!("Stripe MCP server connection was lost, reconnecting");
            if let Err(e) = session.close().await {
                debug!("Error while releasing dead Stripe MCP session: {}", e);
            }
            *slot = None;
            self.connected.store(false, Ordering::SeqCst);
        }

        let spec = self.config.launch_spec();
        let session = self
            .connector
            .connect(&spec)
            .await
            .map_err(StripeMcpError::Connection)?;

        if self.config.debug() {
            info!("Connected to Stripe MCP server");
            // Diagnostic only: a failed listing does not fail the connection.
            match session.list_tools().await {
                Ok(tools) => info!("Available tools: {}", tool_names(&tools)),
                Err(e) => warn!("Failed to list Stripe MCP tools: {}", e),
            }
        } else {
            debug!("Connected to Stripe MCP server");
        }

        *slot = Some(session);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Create a payment link.
    ///
    /// `params` is passed to the server untouched (`line_items`,
    /// `after_completion`, `custom_fields`, ...). Connects first if needed.
    pub async fn create_payment_link(&self, params: Value) -> Result<PaymentLinkResponse> {
        let mut slot = self.session.lock().await;
        self.connect_locked(&mut slot).await?;

        let session = match slot.as_ref() {
            Some(session) => session,
            None => return Err(StripeMcpError::Connection(McpError::ConnectionClosed)),
        };

        let result = session
            .call_tool(PAYMENT_LINKS_CREATE, params)
            .await
            .map_err(StripeMcpError::Creation)?;

        if result.is_error {
            warn!("Stripe MCP server flagged the {} result as an error", PAYMENT_LINKS_CREATE);
        }

        Ok(PaymentLinkResponse::from_text(result.joined_text()))
    }

    /// Tools exposed by the server. Connects first if needed.
    pub async fn list_tools(&self) -> Result<Vec<McpTool>> {
        let mut slot = self.session.lock().await;
        self.connect_locked(&mut slot).await?;

        match slot.as_ref() {
            Some(session) => session.list_tools().await.map_err(StripeMcpError::Connection),
            None => Err(StripeMcpError::Connection(McpError::ConnectionClosed)),
        }
    }

    /// Close the connection to the Stripe MCP server.
    ///
    /// The client is disconnected afterwards even if the server could not be
    /// shut down cleanly. Calling this when not connected does nothing.
    pub async fn close(&self) {
        let session = self.session.lock().await.take();
        self.connected.store(false, Ordering::SeqCst);

        if let Some(mut session) = session {
            if let Err(e) = session.close().await {
                warn!("Error while closing Stripe MCP server: {}", e);
            }

            if self.config.debug() {
                info!("Disconnected from Stripe MCP server");
            } else {
                debug!("Disconnected from Stripe MCP server");
            }
        }
    }
}

fn tool_names(tools: &[McpTool]) -> String {
    tools
        .iter()
        .map(|t| t.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
