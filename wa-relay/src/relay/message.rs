//! Outbound Graph API payloads for media messages.

use serde::{Deserialize, Serialize};

/// MIME type assumed when the upload does not declare one.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// WhatsApp message type chosen from the uploaded file's MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Document,
}

impl MediaKind {
    /// Classify a MIME type. Anything not image, video or audio is a document.
    pub fn from_mime(mime_type: &str) -> Self {
        if mime_type.starts_with("image/") {
            MediaKind::Image
        } else if mime_type.starts_with("video/") {
            MediaKind::Video
        } else if mime_type.starts_with("audio/") {
            MediaKind::Audio
        } else {
            MediaKind::Document
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Document => "document",
        }
    }
}

/// Reference to previously uploaded media.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaObject {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// Typed media body; serializes as `"type": "<kind>", "<kind>": { ... }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MediaContent {
    Image { image: MediaObject },
    Video { video: MediaObject },
    Audio { audio: MediaObject },
    Document { document: MediaObject },
}

/// Outbound media message sent to `/{phone_number_id}/messages`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingMediaMessage {
    pub messaging_product: &'static str,
    pub recipient_type: &'static str,
    pub to: String,
    #[serde(flatten)]
    pub content: MediaContent,
}

impl OutgoingMediaMessage {
    /// Build a message referencing `media_id`.
    ///
    /// Only documents carry the original filename.
    pub fn new(to: String, kind: MediaKind, media_id: String, filename: &str) -> Self {
        let content = match kind {
            MediaKind::Image => MediaContent::Image {
                image: MediaObject { id: media_id, filename: None },
            },
            MediaKind::Video => MediaContent::Video {
                video: MediaObject { id: media_id, filename: None },
            },
            MediaKind::Audio => MediaContent::Audio {
                audio: MediaObject { id: media_id, filename: None },
            },
            MediaKind::Document => MediaContent::Document {
                document: MediaObject {
                    id: media_id,
                    filename: Some(filename.to_string()),
                },
            },
        };

        Self {
            messaging_product: "whatsapp",
            recipient_type: "individual",
            to,
            content,
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self.content {
            MediaContent::Image { .. } => MediaKind::Image,
            MediaContent::Video { .. } => MediaKind::Video,
            MediaContent::Audio { .. } => MediaKind::Audio,
            MediaContent::Document { .. } => MediaKind::Document,
        }
    }
}

/// Response from the media upload endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaUploadResponse {
    pub id: String,
}

/// Response from the message send endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageResponse {
    #[serde(default)]
    pub messages: Vec<SentMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SentMessage {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_media_kind_from_mime() {
        assert_eq!(MediaKind::from_mime("image/png"), MediaKind::Image);
        assert_eq!(MediaKind::from_mime("video/mp4"), MediaKind::Video);
        assert_eq!(MediaKind::from_mime("audio/ogg"), MediaKind::Audio);
        assert_eq!(MediaKind::from_mime("application/pdf"), MediaKind::Document);
        assert_eq!(MediaKind::from_mime(DEFAULT_MIME_TYPE), MediaKind::Document);
        // Prefix match only
        assert_eq!(MediaKind::from_mime("text/image/png"), MediaKind::Document);
    }

    #[test]
    fn test_image_message_shape() {
        let message = OutgoingMediaMessage::new(
            "15551234567".to_string(),
            MediaKind::Image,
            "M1".to_string(),
            "cat.png",
        );

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "messaging_product": "whatsapp",
                "recipient_type": "individual",
                "to": "15551234567",
                "type": "image",
                "image": {"id": "M1"}
            })
        );
    }

    #[test]
    fn test_document_message_carries_filename() {
        let message = OutgoingMediaMessage::new(
            "15551234567".to_string(),
            MediaKind::Document,
            "M2".to_string(),
            "report.pdf",
        );

        assert_eq!(message.kind(), MediaKind::Document);
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "messaging_product": "whatsapp",
                "recipient_type": "individual",
                "to": "15551234567",
                "type": "document",
                "document": {"id": "M2", "filename": "report.pdf"}
            })
        );
    }

    #[test]
    fn test_send_response_parses_message_id() {
        let response: SendMessageResponse = serde_json::from_str(
            r#"{"messaging_product": "whatsapp", "contacts": [{"input": "1555", "wa_id": "1555"}], "messages": [{"id": "wamid.SENT"}]}"#,
        )
        .unwrap();

        assert_eq!(response.messages[0].id, "wamid.SENT");
    }
}
