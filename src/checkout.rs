//! `create_checkout_link` tool: wraps a payment link for a single ad-hoc product.

use crate::error::{Result, StripeMcpError};
use crate::mcp::CallToolResult;
use crate::stripe::{PaymentLinkResponse, StripeMcpClient};
use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::error;

pub const CHECKOUT_TOOL_NAME: &str = "create_checkout_link";
pub const CHECKOUT_TOOL_DESCRIPTION: &str = "Create a Stripe payment link for a product";

/// Arguments of the `create_checkout_link` tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutLinkArgs {
    /// Name of the product
    pub product_name: String,
    /// Product description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Price amount in cents
    pub price_amount: i64,
    /// Currency code
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "usd".to_string()
}

impl CheckoutLinkArgs {
    /// JSON schema advertised in `tools/list`
    pub fn input_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "product_name": {"type": "string", "description": "Name of the product"},
                "description": {"type": "string", "description": "Product description"},
                "price_amount": {"type": "number", "description": "Price amount in cents"},
                "currency": {"type": "string", "default": "usd", "description": "Currency code"}
            },
            "required": ["product_name", "price_amount"]
        })
    }

    /// `paymentLinks.create` arguments: one inline-priced line item.
    pub fn to_payment_link_payload(&self) -> Value {
        let mut product_data = json!({ "name": self.product_name });
        if let Some(description) = &self.description {
            product_data["description"] = json!(description);
        }

        json!({
            "line_items": [{
                "price_data": {
                    "currency": self.currency,
                    "product_data": product_data,
                    "unit_amount": self.price_amount,
                },
                "quantity": 1,
            }]
        })
    }
}

/// What the tool reports back on success
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutLinkSummary {
    pub payment_link_url: String,
    pub payment_link_id: String,
    /// RFC 3339, UTC, millisecond precision
    pub created: String,
}

impl CheckoutLinkSummary {
    pub fn from_response(response: &PaymentLinkResponse) -> Result<Self> {
        let link = response.payment_link().ok_or_else(|| {
            let detail = match response {
                PaymentLinkResponse::RawFallback(raw) => {
                    format!("unexpected response from Stripe: {}", raw)
                }
                PaymentLinkResponse::Decoded(value) => {
                    format!("response is not a payment link: {}", value)
                }
            };
            StripeMcpError::Other(anyhow::anyhow!(detail))
        })?;

        let created = DateTime::from_timestamp(link.created, 0)
            .ok_or_else(|| {
                StripeMcpError::Other(anyhow::anyhow!(
                    "invalid created timestamp: {}",
                    link.created
                ))
            })?
            .to_rfc3339_opts(SecondsFormat::Millis, true);

        Ok(Self {
            payment_link_url: link.url,
            payment_link_id: link.id,
            created,
        })
    }
}

/// Run the tool against `client`, always closing it afterwards.
///
/// Failures are reported as an `isError` tool result, never as an `Err`.
pub async fn run_checkout_tool(client: &StripeMcpClient, args: &CheckoutLinkArgs) -> CallToolResult {
    let outcome = create_summary(client, args).await;
    client.close().await;

    match outcome.and_then(|summary| Ok(serde_json::to_string_pretty(&summary)?)) {
        Ok(text) => CallToolResult::text(text),
        Err(e) => {
            error!("Error creating payment link: {}", e);
            failure_result(&e)
        }
    }
}

async fn create_summary(client: &StripeMcpClient, args: &CheckoutLinkArgs) -> Result<CheckoutLinkSummary> {
    client.connect().await?;
    let response = client
        .create_payment_link(args.to_payment_link_payload())
        .await?;
    CheckoutLinkSummary::from_response(&response)
}

pub fn failure_result(error: &StripeMcpError) -> CallToolResult {
    CallToolResult::error(format!("Error creating payment link: {}", error))
}
