//! Webhook subscription handshake.
//!
//! When a webhook URL is registered, Meta sends
//! `GET /webhook?hub.mode=subscribe&hub.verify_token=...&hub.challenge=...`
//! and expects the challenge echoed back if the token matches.

use tracing::{info, warn};

/// The only `hub.mode` accepted by the handshake.
pub const SUBSCRIBE_MODE: &str = "subscribe";

/// Outcome of a handshake check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// Respond 200 with this challenge body
    Verified(String),
    /// Mode or token present but wrong (403)
    Forbidden,
    /// Mode or token missing (400)
    MissingParams,
}

/// Check a subscription handshake against the configured verify token.
///
/// An absent challenge on an otherwise valid handshake echoes an empty body.
pub fn verify_subscription(
    mode: Option<&str>,
    token: Option<&str>,
    challenge: Option<&str>,
    verify_token: &str,
) -> Verification {
    let (mode, token) = match (mode, token) {
        (Some(mode), Some(token)) if !mode.is_empty() && !token.is_empty() => (mode, token),
        _ => {
            warn!(
                has_mode = mode.is_some_and(|m| !m.is_empty()),
                has_token = token.is_some_and(|t| !t.is_empty()),
                "webhook_verify_missing_params"
            );
            return Verification::MissingParams;
        }
    };

    if mode == SUBSCRIBE_MODE && constant_time_compare(token, verify_token) {
        info!("webhook_verified");
        Verification::Verified(challenge.unwrap_or_default().to_string())
    } else {
        warn!(mode = %mode, "webhook_verify_rejected");
        Verification::Forbidden
    }
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
