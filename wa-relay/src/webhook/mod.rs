//! WhatsApp webhook handling.
//!
//! This module provides:
//! - The subscription handshake check Meta performs with a GET request
//! - Event envelope types for the POST callbacks
//! - Dispatch of inbound messages and statuses to an [`EventSink`]
//!
//! ## Flow
//!
//! ```text
//! POST /webhook → WebhookEnvelope → dispatch_envelope() → EventSink
//! ```

pub mod events;
pub mod types;
pub mod verify;

pub use events::{dispatch_envelope, DispatchSummary, EventSink, TracingSink};
pub use types::{
    Change, Entry, InboundMessage, StatusUpdate, WebhookEnvelope, WHATSAPP_OBJECT,
};
pub use verify::{verify_subscription, Verification, SUBSCRIBE_MODE};
