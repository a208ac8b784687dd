//! Graph API client for media upload and message send.
//!
//! The relay only talks to the platform through [`MediaApi`], so tests can
//! swap in a stub without a network.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Body, Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{error, info};

use super::message::{MediaUploadResponse, OutgoingMediaMessage, SendMessageResponse};
use crate::Config;

/// File to upload as WhatsApp media.
///
/// The contents are streamed from `file`, which must yield exactly `size`
/// bytes.
#[derive(Debug)]
pub struct MediaUpload {
    pub file: File,
    pub size: u64,
    pub file_name: String,
    pub mime_type: String,
}

/// Errors returned by the remote platform or while reaching it.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Request could not be sent or the response could not be read.
    #[error("request to Graph API failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The platform answered with a non-success status.
    #[error("Graph API returned status {status}")]
    Api { status: u16, body: Value },

    /// The platform answered 2xx with a body we could not use.
    #[error("unexpected Graph API response: {0}")]
    InvalidResponse(String),

    /// Phone number ID or access token missing.
    #[error("Graph API credentials are not configured")]
    NotConfigured,
}

impl RemoteError {
    /// Diagnostic payload to pass back to the caller.
    ///
    /// For API errors this is the Graph `error` object when present, else the
    /// whole response body. Other errors yield their message.
    pub fn details(&self) -> Value {
        match self {
            RemoteError::Api { body, .. } => body
                .get("error")
                .cloned()
                .unwrap_or_else(|| body.clone()),
            other => Value::String(other.to_string()),
        }
    }
}

/// Outbound capability used by the media relay.
#[async_trait]
pub trait MediaApi: Send + Sync {
    /// Upload media and return the platform media ID.
    async fn upload_media(&self, upload: MediaUpload) -> Result<String, RemoteError>;

    /// Send a message and return the platform message ID.
    async fn send_message(&self, message: &OutgoingMediaMessage) -> Result<String, RemoteError>;
}

/// [`MediaApi`] backed by the WhatsApp Cloud API.
#[derive(Clone)]
pub struct GraphClient {
    client: Client,
    media_endpoint: Option<String>,
    messages_endpoint: Option<String>,
    access_token: Option<String>,
}

impl GraphClient {
    /// Build a client from configuration with the configured request timeout.
    pub fn from_config(config: &Config) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            media_endpoint: config.media_endpoint(),
            messages_endpoint: config.messages_endpoint(),
            access_token: config.access_token.clone(),
        })
    }

    fn target(&self, endpoint: &Option<String>) -> Result<(String, String), RemoteError> {
        match (endpoint, &self.access_token) {
            (Some(url), Some(token)) => Ok((url.clone(), token.clone())),
            _ => Err(RemoteError::NotConfigured),
        }
    }
}

#[async_trait]
impl MediaApi for GraphClient {
    async fn upload_media(&self, upload: MediaUpload) -> Result<String, RemoteError> {
        let (url, token) = self.target(&self.media_endpoint)?;
        let size = upload.size;

        let body = Body::wrap_stream(ReaderStream::new(upload.file));
        let file_part = multipart::Part::stream_with_length(body, size)
            .file_name(upload.file_name.clone())
            .mime_str(&upload.mime_type)?;

        let form = multipart::Form::new()
            .text("messaging_product", "whatsapp")
            .text("type", upload.mime_type.clone())
            .part("file", file_part);

        info!(
            file_name = %upload.file_name,
            mime_type = %upload.mime_type,
            size_bytes = size,
            "graph_media_upload_starting"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, timeout = e.is_timeout(), "graph_media_upload_request_error");
                RemoteError::Transport(e)
            })?;

        let uploaded: MediaUploadResponse = read_json(response, "graph_media_upload").await?;

        info!(media_id = %uploaded.id, "graph_media_upload_complete");

        Ok(uploaded.id)
    }

    async fn send_message(&self, message: &OutgoingMediaMessage) -> Result<String, RemoteError> {
        let (url, token) = self.target(&self.messages_endpoint)?;

        info!(
            to = %message.to,
            message_type = message.kind().as_str(),
            "graph_message_send_starting"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(message)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, timeout = e.is_timeout(), "graph_message_send_request_error");
                RemoteError::Transport(e)
            })?;

        let sent: SendMessageResponse = read_json(response, "graph_message_send").await?;

        let message_id = sent
            .messages
            .into_iter()
            .next()
            .map(|m| m.id)
            .ok_or_else(|| RemoteError::InvalidResponse("no message id in response".to_string()))?;

        info!(message_id = %message_id, "graph_message_send_complete");

        Ok(message_id)
    }
}

/// Decode a successful response, or turn an error status into [`RemoteError::Api`].
async fn read_json<T: DeserializeOwned>(response: Response, event: &str) -> Result<T, RemoteError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        error!(status = status.as_u16(), body = %body, operation = event, "graph_api_error");
        return Err(RemoteError::Api {
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&text).map_err(|e| {
        error!(error = %e, operation = event, "graph_api_response_invalid");
        RemoteError::InvalidResponse(e.to_string())
    })
}
