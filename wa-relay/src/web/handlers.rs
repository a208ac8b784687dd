//! HTTP endpoint handlers.
//!
//! The webhook handlers answer Meta directly: the handshake is a pure check
//! against the configured verify token, and event callbacks are only logged
//! through the [`EventSink`]. The upload handler stages the file and hands it
//! to the media relay.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        multipart::{Multipart, MultipartRejection},
        Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::relay::{self, MediaApi, RelayError, RelaySuccess};
use crate::webhook::{
    dispatch_envelope, verify_subscription, EventSink, TracingSink, Verification,
    WebhookEnvelope, WHATSAPP_OBJECT,
};
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub api: Arc<dyn MediaApi>,
    pub sink: Arc<dyn EventSink>,
}

impl AppState {
    /// State with the logging event sink.
    pub fn new(config: Config, api: Arc<dyn MediaApi>) -> Self {
        Self::with_sink(config, api, Arc::new(TracingSink))
    }

    pub fn with_sink(config: Config, api: Arc<dyn MediaApi>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            config: Arc::new(config),
            api,
            sink,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// WhatsApp Webhook
// =============================================================================

/// Handshake query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Webhook verification endpoint.
///
/// - 200 with the challenge echoed verbatim on a valid handshake
/// - 403 if mode or token do not match
/// - 400 if mode or token are missing
pub async fn verify_webhook(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Response {
    match verify_subscription(
        query.mode.as_deref(),
        query.verify_token.as_deref(),
        query.challenge.as_deref(),
        &state.config.verify_token,
    ) {
        Verification::Verified(challenge) => (StatusCode::OK, challenge).into_response(),
        Verification::Forbidden => StatusCode::FORBIDDEN.into_response(),
        Verification::MissingParams => StatusCode::BAD_REQUEST.into_response(),
    }
}

/// Webhook event endpoint.
///
/// Only `application/json` bodies are parsed; any other body is treated as an
/// empty object. Envelopes for any object other than a WhatsApp Business
/// Account get 404. Unparseable JSON, or a WhatsApp envelope whose `entry` or
/// `changes` are not arrays, gets 400.
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let body: Value = if is_json(&headers) {
        match serde_json::from_slice(&body) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "webhook_body_invalid");
                return StatusCode::BAD_REQUEST;
            }
        }
    } else {
        debug!(
            content_type = ?headers.get(header::CONTENT_TYPE),
            "webhook_body_not_json"
        );
        Value::Object(Default::default())
    };

    let object = body.get("object").and_then(Value::as_str);
    if object != Some(WHATSAPP_OBJECT) {
        debug!(object = ?object, "webhook_unknown_object");
        return StatusCode::NOT_FOUND;
    }

    let envelope: WebhookEnvelope = match serde_json::from_value(body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, "webhook_envelope_invalid");
            return StatusCode::BAD_REQUEST;
        }
    };

    dispatch_envelope(&envelope, state.sink.as_ref());

    StatusCode::OK
}

/// Whether the request declares an `application/json` body.
fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|essence| essence.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

// =============================================================================
// Media Relay
// =============================================================================

/// Upload endpoint: relay one multipart `file` to the configured recipient.
///
/// A request that is not `multipart/form-data` carries no file and gets 400.
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<RelaySuccess>, RelayError> {
    let mut multipart = multipart.map_err(|e| {
        debug!(error = %e, "upload_not_multipart");
        RelayError::NoFile
    })?;

    let staged = relay::receive_file(&mut multipart, &state.config.upload_dir).await?;
    let success = relay::relay_upload(&state.config, state.api.as_ref(), staged).await?;
    Ok(Json(success))
}
