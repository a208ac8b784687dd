//! Media relay: upload a local file to WhatsApp and send it on.
//!
//! ## Flow
//!
//! ```text
//! multipart file → TempUpload → MediaApi::upload_media → media id
//!                                  → MediaApi::send_message → message id
//! ```
//!
//! The staged file is removed on every exit path, and the message send is
//! never attempted when the upload fails.

pub mod client;
pub mod message;
pub mod temp_file;

use std::io;
use std::path::Path;

use axum::{
    extract::multipart::{Multipart, MultipartError},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::Config;

pub use client::{GraphClient, MediaApi, MediaUpload, RemoteError};
pub use message::{MediaKind, OutgoingMediaMessage, DEFAULT_MIME_TYPE};
pub use temp_file::{StageError, TempUpload};

/// Multipart field carrying the file.
pub const FILE_FIELD: &str = "file";

/// Errors that end a relay request.
#[derive(Debug, Error)]
pub enum RelayError {
    /// No file part in the request.
    #[error("No file uploaded")]
    NoFile,

    /// The multipart body could not be read.
    #[error("Invalid multipart request: {0}")]
    Multipart(#[from] MultipartError),

    /// Access token or phone number ID missing.
    #[error("Server configuration missing META_ACCESS_TOKEN or META_PHONE_NUMBER_ID")]
    NotConfigured,

    /// Local filesystem error while staging or reading the upload.
    #[error("Failed to store uploaded file: {0}")]
    Storage(#[from] io::Error),

    /// Media upload or message send failed.
    #[error("Failed to send media: {0}")]
    Remote(#[from] RemoteError),
}

impl From<StageError<MultipartError>> for RelayError {
    fn from(err: StageError<MultipartError>) -> Self {
        match err {
            StageError::Io(e) => RelayError::Storage(e),
            StageError::Source(e) => RelayError::Multipart(e),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::NoFile => (StatusCode::BAD_REQUEST, json!({ "error": self.to_string() })),
            Self::Multipart(e) => (
                e.status(),
                json!({ "error": "Invalid multipart request", "details": e.body_text() }),
            ),
            Self::NotConfigured => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": self.to_string() }),
            ),
            Self::Storage(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Failed to store uploaded file", "details": e.to_string() }),
            ),
            Self::Remote(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Failed to upload or send media", "details": e.details() }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

/// Successful relay response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelaySuccess {
    pub success: bool,
    pub message: String,
    pub media_id: String,
    pub message_id: String,
}

/// Read the multipart body and stage the `file` part in `upload_dir`.
///
/// Other fields are skipped. Only the first file part is kept.
pub async fn receive_file(
    multipart: &mut Multipart,
    upload_dir: &Path,
) -> Result<TempUpload, RelayError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };
        let mime_type = field
            .content_type()
            .unwrap_or(DEFAULT_MIME_TYPE)
            .to_string();

        let upload = TempUpload::stage(upload_dir, file_name, mime_type, field).await?;

        info!(
            file_name = %upload.file_name(),
            mime_type = %upload.mime_type(),
            size_bytes = upload.size(),
            "upload_received"
        );

        return Ok(upload);
    }

    Err(RelayError::NoFile)
}

/// Relay a staged upload: upload it, send it to the configured recipient,
/// and remove the staged file whatever the outcome.
pub async fn relay_upload(
    config: &Config,
    api: &dyn MediaApi,
    upload: TempUpload,
) -> Result<RelaySuccess, RelayError> {
    let result = forward(config, api, &upload).await;
    upload.close();

    match &result {
        Ok(success) => info!(
            media_id = %success.media_id,
            message_id = %success.message_id,
            "relay_complete"
        ),
        Err(e) => error!(error = %e, "relay_failed"),
    }

    result
}

async fn forward(
    config: &Config,
    api: &dyn MediaApi,
    upload: &TempUpload,
) -> Result<RelaySuccess, RelayError> {
    if config.relay_credentials().is_none() {
        warn!(
            access_token_configured = config.access_token.is_some(),
            phone_number_id_configured = config.phone_number_id.is_some(),
            "relay_not_configured"
        );
        return Err(RelayError::NotConfigured);
    }

    let file = upload.open().await?;

    let media_id = api
        .upload_media(MediaUpload {
            file,
            size: upload.size(),
            file_name: upload.file_name().to_string(),
            mime_type: upload.mime_type().to_string(),
        })
        .await?;

    let kind = MediaKind::from_mime(upload.mime_type());
    let message = OutgoingMediaMessage::new(
        config.recipient.clone(),
        kind,
        media_id.clone(),
        upload.file_name(),
    );

    let message_id = api.send_message(&message).await?;

    Ok(RelaySuccess {
        success: true,
        message: "File uploaded and sent successfully".to_string(),
        media_id,
        message_id,
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::body::Bytes;
    use futures::stream;
    use serde_json::Value;
    use tokio::io::AsyncReadExt;

    use super::*;

    #[derive(Default)]
    struct StubApi {
        fail_upload: bool,
        fail_send: bool,
        uploads: Mutex<Vec<(String, String, usize)>>,
        sends: Mutex<Vec<Value>>,
    }

    #[async_trait]
    impl MediaApi for StubApi {
        async fn upload_media(&self, mut upload: MediaUpload) -> Result<String, RemoteError> {
            let mut contents = Vec::new();
            upload.file.read_to_end(&mut contents).await.unwrap();
            assert_eq!(contents.len() as u64, upload.size);
            self.uploads
                .lock()
                .unwrap()
                .push((upload.file_name, upload.mime_type, contents.len()));
            if self.fail_upload {
                return Err(RemoteError::Api {
                    status: 400,
                    body: json!({"error": {"message": "bad media"}}),
                });
            }
            Ok("M1".to_string())
        }

        async fn send_message(&self, message: &OutgoingMediaMessage) -> Result<String, RemoteError> {
            self.sends
                .lock()
                .unwrap()
                .push(serde_json::to_value(message).unwrap());
            if self.fail_send {
                return Err(RemoteError::InvalidResponse("no message id".to_string()));
            }
            Ok("SENT1".to_string())
        }
    }

    fn config(dir: &Path) -> Config {
        Config {
            verify_token: "verify".to_string(),
            access_token: Some("token".to_string()),
            phone_number_id: Some("123".to_string()),
            recipient: "15551234567".to_string(),
            graph_api_base_url: "http://localhost/v18.0".to_string(),
            port: 3000,
            upload_dir: dir.to_path_buf(),
            request_timeout_ms: 1000,
            max_upload_bytes: 1024,
        }
    }

    async fn staged(dir: &Path, name: &str, mime: &str) -> (TempUpload, PathBuf) {
        let chunks = stream::iter(vec![Ok::<_, std::convert::Infallible>(Bytes::from_static(
            b"content",
        ))]);
        let upload = TempUpload::stage(dir, name.to_string(), mime.to_string(), chunks)
            .await
            .unwrap();
        let path = upload.path().to_path_buf();
        (upload, path)
    }

    #[tokio::test]
    async fn test_relay_document_success() {
        let dir = tempfile::tempdir().unwrap();
        let api = StubApi::default();
        let (upload, path) = staged(dir.path(), "report.pdf", "application/pdf").await;

        let success = relay_upload(&config(dir.path()), &api, upload).await.unwrap();

        assert_eq!(success.media_id, "M1");
        assert_eq!(success.message_id, "SENT1");
        assert!(!path.exists());

        let uploads = api.uploads.lock().unwrap();
        assert_eq!(
            *uploads,
            vec![("report.pdf".to_string(), "application/pdf".to_string(), 7)]
        );
        let sends = api.sends.lock().unwrap();
        assert_eq!(sends[0]["type"], "document");
        assert_eq!(sends[0]["document"]["filename"], "report.pdf");
        assert_eq!(sends[0]["to"], "15551234567");
    }

    #[tokio::test]
    async fn test_relay_upload_failure_skips_send() {
        let dir = tempfile::tempdir().unwrap();
        let api = StubApi {
            fail_upload: true,
            ..Default::default()
        };
        let (upload, path) = staged(dir.path(), "a.png", "image/png").await;

        let err = relay_upload(&config(dir.path()), &api, upload).await.unwrap_err();

        match &err {
            RelayError::Remote(remote @ RemoteError::Api { status: 400, .. }) => {
                assert_eq!(remote.details(), json!({"message": "bad media"}));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(api.sends.lock().unwrap().is_empty());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_relay_send_failure_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let api = StubApi {
            fail_send: true,
            ..Default::default()
        };
        let (upload, path) = staged(dir.path(), "clip.mp4", "video/mp4").await;

        let err = relay_upload(&config(dir.path()), &api, upload).await.unwrap_err();

        assert!(matches!(err, RelayError::Remote(RemoteError::InvalidResponse(_))));
        assert_eq!(api.sends.lock().unwrap()[0]["type"], "video");
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_relay_not_configured_makes_no_calls() {
        let dir = tempfile::tempdir().unwrap();
        let api = StubApi::default();
        let mut config = config(dir.path());
        config.access_token = None;
        let (upload, path) = staged(dir.path(), "a.ogg", "audio/ogg").await;

        let err = relay_upload(&config, &api, upload).await.unwrap_err();

        assert!(matches!(err, RelayError::NotConfigured));
        assert!(api.uploads.lock().unwrap().is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn test_error_statuses() {
        assert_eq!(RelayError::NoFile.into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            RelayError::NotConfigured.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            RelayError::Remote(RemoteError::NotConfigured)
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_success_serializes_camel_case() {
        let success = RelaySuccess {
            success: true,
            message: "ok".to_string(),
            media_id: "M1".to_string(),
            message_id: "SENT1".to_string(),
        };

        assert_eq!(
            serde_json::to_value(&success).unwrap(),
            json!({"success": true, "message": "ok", "mediaId": "M1", "messageId": "SENT1"})
        );
    }
}
