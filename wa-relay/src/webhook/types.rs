//! Webhook event envelope types.
//!
//! Meta delivers every WhatsApp notification wrapped in the same envelope:
//!
//! ```text
//! { object, entry: [ { id, changes: [ { field, value: { messages?, statuses? } } ] } ] }
//! ```
//!
//! Messages and statuses are opaque records: they are kept as raw JSON and
//! the fields worth logging are read leniently, so one odd record never
//! rejects the rest of the batch. A change's `value` is only decoded when its
//! `field` is `messages`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `object` value identifying WhatsApp Business Account notifications.
pub const WHATSAPP_OBJECT: &str = "whatsapp_business_account";

/// Change `field` carrying inbound messages and delivery statuses.
pub const MESSAGES_FIELD: &str = "messages";

/// Top-level webhook payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEnvelope {
    /// Source object type
    #[serde(default)]
    pub object: Option<String>,
    /// Batched entries, one per business account
    #[serde(default)]
    pub entry: Vec<Entry>,
}

impl WebhookEnvelope {
    /// Whether this envelope carries WhatsApp Business Account events.
    pub fn is_whatsapp(&self) -> bool {
        self.object.as_deref() == Some(WHATSAPP_OBJECT)
    }
}

/// One entry of the envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    /// WhatsApp Business Account ID
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub changes: Vec<Change>,
}

/// A single change notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub field: Value,
    #[serde(default)]
    pub value: Option<Value>,
}

impl Change {
    pub fn is_messages(&self) -> bool {
        self.field.as_str() == Some(MESSAGES_FIELD)
    }

    /// Messages and statuses carried by this change.
    ///
    /// A collection that is absent or not an array yields no records.
    pub fn records(&self) -> (Vec<InboundMessage>, Vec<StatusUpdate>) {
        let value = match &self.value {
            Some(value) => value,
            None => return (Vec::new(), Vec::new()),
        };

        let messages = collection(value, "messages")
            .map(|v| InboundMessage(v.clone()))
            .collect();
        let statuses = collection(value, "statuses")
            .map(|v| StatusUpdate(v.clone()))
            .collect();

        (messages, statuses)
    }
}

fn collection<'a>(value: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    value
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

/// Read a field as text: strings as is, numbers and booleans formatted.
fn field_text(record: &Value, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Message received from a WhatsApp user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InboundMessage(pub Value);

impl InboundMessage {
    pub fn id(&self) -> Option<String> {
        field_text(&self.0, "id")
    }

    /// Sender WhatsApp ID
    pub fn from(&self) -> Option<String> {
        field_text(&self.0, "from")
    }

    pub fn timestamp(&self) -> Option<String> {
        field_text(&self.0, "timestamp")
    }

    /// Message type (`text`, `image`, `document`, ...)
    pub fn kind(&self) -> Option<String> {
        field_text(&self.0, "type")
    }
}

/// Delivery status of a message previously sent by the business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusUpdate(pub Value);

impl StatusUpdate {
    pub fn id(&self) -> Option<String> {
        field_text(&self.0, "id")
    }

    /// `sent`, `delivered`, `read` or `failed`
    pub fn status(&self) -> Option<String> {
        field_text(&self.0, "status")
    }

    pub fn recipient_id(&self) -> Option<String> {
        field_text(&self.0, "recipient_id")
    }

    pub fn timestamp(&self) -> Option<String> {
        field_text(&self.0, "timestamp")
    }
}
