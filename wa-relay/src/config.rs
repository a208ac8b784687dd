//! Configuration module for environment variable parsing.
//!
//! Reads all configuration from environment variables once at startup. The
//! resulting [`Config`] is immutable and shared by reference with the
//! webhook handler and the media relay.

use std::env;
use std::path::PathBuf;

use tracing::warn;
use url::Url;

/// Graph API base used when `GRAPH_API_BASE_URL` is unset or invalid.
pub const DEFAULT_GRAPH_API_BASE_URL: &str = "https://graph.facebook.com/v18.0";

/// Verify token used when `META_VERIFY_TOKEN` is unset.
pub const DEFAULT_VERIFY_TOKEN: &str = "your_verify_token";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Token Meta echoes back during the webhook subscription handshake
    pub verify_token: String,

    /// Bearer token for the Graph API
    pub access_token: Option<String>,

    /// WhatsApp Business phone number ID messages are sent from
    pub phone_number_id: Option<String>,

    /// Recipient WhatsApp ID for relayed media
    pub recipient: String,

    /// Versioned Graph API base, e.g. `https://graph.facebook.com/v18.0`
    pub graph_api_base_url: String,

    /// Port for the web server to listen on
    pub port: u16,

    /// Directory uploaded files are staged in before relaying
    pub upload_dir: PathBuf,

    /// HTTP request timeout in milliseconds for outbound Graph API calls
    pub request_timeout_ms: u64,

    /// Maximum accepted request body size for uploads
    pub max_upload_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            verify_token: env::var("META_VERIFY_TOKEN")
                .unwrap_or_else(|_| DEFAULT_VERIFY_TOKEN.to_string()),

            access_token: parse_secret("META_ACCESS_TOKEN"),

            phone_number_id: parse_secret("META_PHONE_NUMBER_ID"),

            recipient: env::var("WHATSAPP_RECIPIENT").unwrap_or_default(),

            graph_api_base_url: parse_base_url("GRAPH_API_BASE_URL"),

            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),

            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),

            request_timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30_000),

            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100 * 1024 * 1024),
        }
    }

    /// Access token and phone number ID, if both are configured.
    pub fn relay_credentials(&self) -> Option<(&str, &str)> {
        match (&self.access_token, &self.phone_number_id) {
            (Some(token), Some(phone)) => Some((token.as_str(), phone.as_str())),
            _ => None,
        }
    }

    /// Graph API media upload endpoint for the configured phone number.
    pub fn media_endpoint(&self) -> Option<String> {
        self.phone_endpoint("media")
    }

    /// Graph API message send endpoint for the configured phone number.
    pub fn messages_endpoint(&self) -> Option<String> {
        self.phone_endpoint("messages")
    }

    fn phone_endpoint(&self, resource: &str) -> Option<String> {
        let phone = self.phone_number_id.as_deref()?;
        Some(format!(
            "{}/{}/{}",
            self.graph_api_base_url.trim_end_matches('/'),
            phone,
            resource
        ))
    }
}

/// Read a secret, treating empty or whitespace-only values as unset.
fn parse_secret(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read an absolute http(s) base URL, falling back to the public Graph API.
fn parse_base_url(name: &str) -> String {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return DEFAULT_GRAPH_API_BASE_URL.to_string(),
    };

    match Url::parse(raw.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            url.as_str().trim_end_matches('/').to_string()
        }
        _ => {
            warn!(env_var = name, value = %raw, "Invalid base URL, using default");
            DEFAULT_GRAPH_API_BASE_URL.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_phone(phone: Option<&str>) -> Config {
        Config {
            verify_token: "verify".to_string(),
            access_token: Some("token".to_string()),
            phone_number_id: phone.map(str::to_string),
            recipient: "15550001111".to_string(),
            graph_api_base_url: "https://graph.example.com/v18.0/".to_string(),
            port: 3000,
            upload_dir: PathBuf::from("uploads"),
            request_timeout_ms: 1000,
            max_upload_bytes: 1024,
        }
    }

    #[test]
    fn test_parse_secret_blank_is_none() {
        env::set_var("TEST_SECRET_BLANK", "   ");
        assert_eq!(parse_secret("TEST_SECRET_BLANK"), None);
        env::remove_var("TEST_SECRET_BLANK");
    }

    #[test]
    fn test_parse_secret_trims() {
        env::set_var("TEST_SECRET_VALUE", " abc ");
        assert_eq!(parse_secret("TEST_SECRET_VALUE"), Some("abc".to_string()));
        env::remove_var("TEST_SECRET_VALUE");
    }

    #[test]
    fn test_parse_base_url_default() {
        assert_eq!(
            parse_base_url("NONEXISTENT_BASE_URL"),
            DEFAULT_GRAPH_API_BASE_URL
        );
    }

    #[test]
    fn test_parse_base_url_invalid_falls_back() {
        env::set_var("TEST_BASE_URL_INVALID", "ftp://nope");
        assert_eq!(
            parse_base_url("TEST_BASE_URL_INVALID"),
            DEFAULT_GRAPH_API_BASE_URL
        );
        env::remove_var("TEST_BASE_URL_INVALID");
    }

    #[test]
    fn test_parse_base_url_strips_trailing_slash() {
        env::set_var("TEST_BASE_URL_VALID", "http://localhost:9000/v19.0/");
        assert_eq!(
            parse_base_url("TEST_BASE_URL_VALID"),
            "http://localhost:9000/v19.0"
        );
        env::remove_var("TEST_BASE_URL_VALID");
    }

    #[test]
    fn test_endpoints() {
        let config = config_with_phone(Some("12345"));
        assert_eq!(
            config.media_endpoint().as_deref(),
            Some("https://graph.example.com/v18.0/12345/media")
        );
        assert_eq!(
            config.messages_endpoint().as_deref(),
            Some("https://graph.example.com/v18.0/12345/messages")
        );
    }

    #[test]
    fn test_relay_credentials_require_phone() {
        let config = config_with_phone(None);
        assert!(config.relay_credentials().is_none());
        assert!(config.media_endpoint().is_none());

        let config = config_with_phone(Some("12345"));
        assert_eq!(config.relay_credentials(), Some(("token", "12345")));
    }
}
