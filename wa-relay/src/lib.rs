//! wa-relay - WhatsApp Cloud API webhook receiver and media relay.
//!
//! This library provides the modules behind the `wa-relay` binary:
//! - `webhook`: subscription handshake and event dispatch
//! - `relay`: upload a local file as WhatsApp media and send it
//! - `web`: axum handlers and router
//!
//! ## Architecture
//!
//! ```text
//! Meta → GET/POST /webhook → verify / dispatch → EventSink
//! Client → POST /upload → TempUpload → MediaApi (upload, send) → Graph API
//! ```

pub mod config;
pub mod relay;
pub mod web;
pub mod webhook;

// Re-export commonly used types
pub use config::Config;
pub use relay::{GraphClient, MediaApi, RelayError, RemoteError};
pub use web::{router, AppState};
pub use webhook::{EventSink, TracingSink};
