//! Dispatch of webhook events.
//!
//! Walks a [`WebhookEnvelope`] and hands every inbound message and delivery
//! status found under a `messages` change to an [`EventSink`]. Nothing is
//! persisted; the production sink only logs.

use tracing::{debug, info};

use super::types::{InboundMessage, StatusUpdate, WebhookEnvelope};

/// Receiver for events extracted from a webhook envelope.
pub trait EventSink: Send + Sync {
    /// Called once per inbound message.
    fn on_message(&self, message: &InboundMessage);

    /// Called once per delivery status.
    fn on_status(&self, status: &StatusUpdate);
}

/// Sink that writes each event to the structured log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn on_message(&self, message: &InboundMessage) {
        info!(
            message_id = ?message.id(),
            from = ?message.from(),
            message_type = ?message.kind(),
            timestamp = ?message.timestamp(),
            payload = %message.0,
            "whatsapp_message_received"
        );
    }

    fn on_status(&self, status: &StatusUpdate) {
        info!(
            message_id = ?status.id(),
            status = ?status.status(),
            recipient_id = ?status.recipient_id(),
            timestamp = ?status.timestamp(),
            payload = %status.0,
            "whatsapp_message_status"
        );
    }
}

/// Counts of events handed to the sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub messages: usize,
    pub statuses: usize,
}

/// Dispatch every message and status in a WhatsApp envelope to `sink`.
///
/// Callers are expected to have checked [`WebhookEnvelope::is_whatsapp`].
/// Changes for fields other than `messages` are skipped.
pub fn dispatch_envelope(envelope: &WebhookEnvelope, sink: &dyn EventSink) -> DispatchSummary {
    let mut summary = DispatchSummary::default();

    for entry in &envelope.entry {
        for change in &entry.changes {
            if !change.is_messages() {
                debug!(entry_id = ?entry.id, field = %change.field, "webhook_change_skipped");
                continue;
            }

            let (messages, statuses) = change.records();

            for message in &messages {
                sink.on_message(message);
            }
            for status in &statuses {
                sink.on_status(status);
            }

            summary.messages += messages.len();
            summary.statuses += statuses.len();
        }
    }

    info!(
        entries = envelope.entry.len(),
        messages = summary.messages,
        statuses = summary.statuses,
        "webhook_dispatch_complete"
    );

    summary
}
