//! Lightweight client for creating Stripe payment links through Stripe's MCP
//! server (`npx -y @stripe/mcp`).
//!
//! ```no_run
//! # async fn run() -> stripe_mcp_client::Result<()> {
//! use stripe_mcp_client::{ClientOptions, StripeMcpClient};
//! use serde_json::json;
//!
//! let client = StripeMcpClient::new(ClientOptions::default())?;
//! let link = client
//!     .create_payment_link(json!({
//!         "line_items": [{"price": "price_123", "quantity": 1}]
//!     }))
//!     .await;
//! client.close().await;
//! println!("{:?}", link?.payment_link());
//! # Ok(())
//! # }
//! ```

pub mod checkout;
pub mod config;
pub mod error;
pub mod mcp;
pub mod server;
pub mod stripe;

pub use config::{ClientOptions, Config, LaunchSpec, SessionConfig};
pub use error::{McpError, Result, StripeMcpError};
pub use stripe::{PaymentLink, PaymentLinkResponse, StripeMcpClient, PAYMENT_LINKS_CREATE};
