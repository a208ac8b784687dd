//! Web server module.
//!
//! This module provides the HTTP surface of the relay:
//! - `GET /webhook`: subscription handshake
//! - `POST /webhook`: event callbacks, dispatched to the event sink
//! - `POST /upload`: media relay
//! - `GET /health`: liveness

pub mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{
    health, receive_webhook, upload, verify_webhook, AppState, HealthResponse, VerifyQuery,
};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health))
        .route("/webhook", get(verify_webhook).post(receive_webhook))
        .route(
            "/upload",
            post(upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
