//! Billing webhook event types.
//!
//! Decodes verified webhook bodies into a typed `BillingEvent`. Only the
//! fields the reconciler consumes are captured; everything else in the
//! provider's payload is ignored.

use serde::{Deserialize, Deserializer};

use super::webhook_errors::WebhookError;
use crate::domain::foundation::Timestamp;

/// Top-level `{type, data}` structure of every webhook body.
#[derive(Debug, Clone, Deserialize)]
pub struct EventEnvelope {
    /// Event type tag (e.g., "subscription.created").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Event-specific payload; shape depends on `event_type`.
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Subscription object carried by `subscription.*` events.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPayload {
    /// Provider subscription id.
    #[serde(default)]
    pub id: Option<String>,

    /// Provider customer id the subscription belongs to.
    pub customer_id: String,

    #[serde(default)]
    pub price_id: Option<String>,

    /// Billing interval discriminator ("month", "year", ...).
    #[serde(default)]
    pub interval: Option<String>,

    /// Provider-defined status, stored verbatim.
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub trial_end: Option<Timestamp>,
}

/// Customer object carried by `customer.created` and, optionally, by
/// subscription events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPayload {
    /// Provider customer id.
    #[serde(default)]
    pub id: Option<String>,

    /// Our organization id, as registered with the provider.
    #[serde(default)]
    pub external_id: Option<String>,
}

/// Invoice object carried by `invoice.*` events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// `data` of a `subscription.*` event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubscriptionEventData {
    pub subscription: SubscriptionPayload,
    #[serde(default)]
    pub customer: Option<CustomerPayload>,
}

impl SubscriptionEventData {
    /// Customer-level external id hint, if the provider sent one.
    pub fn external_id_hint(&self) -> Option<&str> {
        self.customer
            .as_ref()
            .and_then(|c| c.external_id.as_deref())
            .filter(|hint| !hint.trim().is_empty())
    }
}

/// `data` of a `customer.created` event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CustomerEventData {
    pub customer: CustomerPayload,
}

/// `data` of an `invoice.*` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InvoiceEventData {
    #[serde(default)]
    pub invoice: Option<InvoicePayload>,
}

/// Event type tags this service recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingEventType {
    SubscriptionCreated,
    SubscriptionUpdated,
    SubscriptionActivated,
    SubscriptionCanceled,
    SubscriptionExpired,
    CustomerCreated,
    InvoicePaid,
    InvoicePaymentFailed,
}

impl BillingEventType {
    /// Parses a type tag; `None` for tags this service does not handle.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "subscription.created" => Some(Self::SubscriptionCreated),
            "subscription.updated" => Some(Self::SubscriptionUpdated),
            "subscription.activated" => Some(Self::SubscriptionActivated),
            "subscription.canceled" => Some(Self::SubscriptionCanceled),
            "subscription.expired" => Some(Self::SubscriptionExpired),
            "customer.created" => Some(Self::CustomerCreated),
            "invoice.paid" => Some(Self::InvoicePaid),
            "invoice.payment_failed" => Some(Self::InvoicePaymentFailed),
            _ => None,
        }
    }

    /// Convert to the provider's event type string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubscriptionCreated => "subscription.created",
            Self::SubscriptionUpdated => "subscription.updated",
            Self::SubscriptionActivated => "subscription.activated",
            Self::SubscriptionCanceled => "subscription.canceled",
            Self::SubscriptionExpired => "subscription.expired",
            Self::CustomerCreated => "customer.created",
            Self::InvoicePaid => "invoice.paid",
            Self::InvoicePaymentFailed => "invoice.payment_failed",
        }
    }
}

/// A decoded billing webhook event.
///
/// One variant per recognised event type, plus `Unknown` for anything the
/// provider adds later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEvent {
    SubscriptionCreated(SubscriptionEventData),
    SubscriptionUpdated(SubscriptionEventData),
    SubscriptionActivated(SubscriptionEventData),
    SubscriptionCanceled(SubscriptionEventData),
    SubscriptionExpired(SubscriptionEventData),
    CustomerCreated(CustomerEventData),
    InvoicePaid(InvoiceEventData),
    InvoicePaymentFailed(InvoiceEventData),
    Unknown { event_type: String },
}

impl BillingEvent {
    /// Decodes a verified raw body.
    ///
    /// # Errors
    ///
    /// Returns `MalformedPayload` when the body is not JSON, has no string
    /// `type`, or carries `data` that does not fit a recognised type.
    pub fn decode(payload: &[u8]) -> Result<Self, WebhookError> {
        let envelope: EventEnvelope = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;
        Self::from_envelope(envelope)
    }

    /// Types the envelope's `data` according to its tag.
    pub fn from_envelope(envelope: EventEnvelope) -> Result<Self, WebhookError> {
        let Some(event_type) = BillingEventType::parse(&envelope.event_type) else {
            return Ok(BillingEvent::Unknown {
                event_type: envelope.event_type,
            });
        };

        let data = envelope.data;
        let event = match event_type {
            BillingEventType::SubscriptionCreated => {
                BillingEvent::SubscriptionCreated(typed_data(event_type, data)?)
            }
            BillingEventType::SubscriptionUpdated => {
                BillingEvent::SubscriptionUpdated(typed_data(event_type, data)?)
            }
            BillingEventType::SubscriptionActivated => {
                BillingEvent::SubscriptionActivated(typed_data(event_type, data)?)
            }
            BillingEventType::SubscriptionCanceled => {
                BillingEvent::SubscriptionCanceled(typed_data(event_type, data)?)
            }
            BillingEventType::SubscriptionExpired => {
                BillingEvent::SubscriptionExpired(typed_data(event_type, data)?)
            }
            BillingEventType::CustomerCreated => {
                BillingEvent::CustomerCreated(typed_data(event_type, data)?)
            }
            BillingEventType::InvoicePaid => {
                BillingEvent::InvoicePaid(invoice_data(event_type, data)?)
            }
            BillingEventType::InvoicePaymentFailed => {
                BillingEvent::InvoicePaymentFailed(invoice_data(event_type, data)?)
            }
        };

        Ok(event)
    }

    /// Returns the provider's type tag for this event.
    pub fn event_type(&self) -> &str {
        match self {
            BillingEvent::SubscriptionCreated(_) => BillingEventType::SubscriptionCreated.as_str(),
            BillingEvent::SubscriptionUpdated(_) => BillingEventType::SubscriptionUpdated.as_str(),
            BillingEvent::SubscriptionActivated(_) => {
                BillingEventType::SubscriptionActivated.as_str()
            }
            BillingEvent::SubscriptionCanceled(_) => BillingEventType::SubscriptionCanceled.as_str(),
            BillingEvent::SubscriptionExpired(_) => BillingEventType::SubscriptionExpired.as_str(),
            BillingEvent::CustomerCreated(_) => BillingEventType::CustomerCreated.as_str(),
            BillingEvent::InvoicePaid(_) => BillingEventType::InvoicePaid.as_str(),
            BillingEvent::InvoicePaymentFailed(_) => BillingEventType::InvoicePaymentFailed.as_str(),
            BillingEvent::Unknown { event_type } => event_type,
        }
    }

    /// Returns the subscription data for `subscription.*` events.
    pub fn subscription_data(&self) -> Option<&SubscriptionEventData> {
        match self {
            BillingEvent::SubscriptionCreated(data)
            | BillingEvent::SubscriptionUpdated(data)
            | BillingEvent::SubscriptionActivated(data)
            | BillingEvent::SubscriptionCanceled(data)
            | BillingEvent::SubscriptionExpired(data) => Some(data),
            _ => None,
        }
    }
}

fn typed_data<T: serde::de::DeserializeOwned>(
    event_type: BillingEventType,
    data: serde_json::Value,
) -> Result<T, WebhookError> {
    serde_json::from_value(data).map_err(|e| {
        WebhookError::MalformedPayload(format!("{} data: {}", event_type.as_str(), e))
    })
}

/// Invoice events carry nothing we act on, so a missing `data` is tolerated.
fn invoice_data(
    event_type: BillingEventType,
    data: serde_json::Value,
) -> Result<InvoiceEventData, WebhookError> {
    if data.is_null() {
        return Ok(InvoiceEventData::default());
    }
    typed_data(event_type, data)
}

/// Values at or above this are epoch milliseconds rather than seconds
/// (as seconds they would fall after the year 5000).
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Epoch(i64),
    Text(String),
}

fn deserialize_optional_timestamp<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let raw: Option<RawTimestamp> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(RawTimestamp::Epoch(value)) => {
            let secs = if value >= MILLIS_THRESHOLD {
                value / 1000
            } else {
                value
            };
            Timestamp::from_unix_secs(secs)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("timestamp {} out of range", value)))
        }
        Some(RawTimestamp::Text(text)) => chrono::DateTime::parse_from_rfc3339(&text)
            .map(|dt| Some(Timestamp::from_datetime(dt.with_timezone(&chrono::Utc))))
            .map_err(|e| D::Error::custom(format!("invalid timestamp '{}': {}", text, e))),
    }
}

/// Builder for creating test webhook bodies.
#[cfg(test)]
pub struct BillingEventBuilder {
    event_type: String,
    data: serde_json::Value,
}

#[cfg(test)]
impl BillingEventBuilder {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            data: serde_json::json!({}),
        }
    }

    pub fn subscription(mut self, subscription: serde_json::Value) -> Self {
        self.data["subscription"] = subscription;
        self
    }

    pub fn customer(mut self, customer: serde_json::Value) -> Self {
        self.data["customer"] = customer;
        self
    }

    pub fn to_json(&self) -> String {
        serde_json::json!({ "type": self.event_type, "data": self.data }).to_string()
    }

    pub fn build(self) -> BillingEvent {
        BillingEvent::decode(self.to_json().as_bytes()).expect("builder produces valid events")
    }
}
