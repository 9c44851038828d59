use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Map, Value};
use tracing::debug;

/// Key under which an undecodable response is exposed.
pub const RAW_RESPONSE_KEY: &str = "rawResponse";

/// Outcome of a payment link request.
///
/// The server answers with text that is normally JSON. Text that does not
/// decode is kept verbatim rather than treated as a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentLinkResponse {
    Decoded(Value),
    RawFallback(String),
}

impl PaymentLinkResponse {
    pub fn from_text(text: String) -> Self {
        match serde_json::from_str(&text) {
            Ok(value) => PaymentLinkResponse::Decoded(value),
            Err(e) => {
                debug!("Payment link response is not JSON ({}), keeping raw text", e);
                PaymentLinkResponse::RawFallback(text)
            }
        }
    }

    pub fn is_decoded(&self) -> bool {
        matches!(self, PaymentLinkResponse::Decoded(_))
    }

    pub fn raw_response(&self) -> Option<&str> {
        match self {
            PaymentLinkResponse::RawFallback(text) => Some(text),
            PaymentLinkResponse::Decoded(_) => None,
        }
    }

    /// Typed view of a decoded response, if it has the payment link shape.
    pub fn payment_link(&self) -> Option<PaymentLink> {
        match self {
            PaymentLinkResponse::Decoded(value) => PaymentLink::deserialize(value).ok(),
            PaymentLinkResponse::RawFallback(_) => None,
        }
    }

    /// The decoded value, or `{"rawResponse": text}`.
    pub fn into_value(self) -> Value {
        match self {
            PaymentLinkResponse::Decoded(value) => value,
            PaymentLinkResponse::RawFallback(text) => json!({ RAW_RESPONSE_KEY: text }),
        }
    }
}

impl Serialize for PaymentLinkResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PaymentLinkResponse::Decoded(value) => value.serialize(serializer),
            PaymentLinkResponse::RawFallback(text) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(RAW_RESPONSE_KEY, text)?;
                map.end()
            }
        }
    }
}

/// Stripe payment link object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentLink {
    pub id: String,
    pub object: String,
    pub url: String,
    /// Unix timestamp (seconds)
    pub created: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
