//! wa-relay - WhatsApp webhook receiver and media relay.
//!
//! This binary:
//! - Answers the WhatsApp webhook handshake and logs inbound events
//! - Relays uploaded files to a configured recipient as WhatsApp media

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wa_relay::{router, AppState, Config, GraphClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before anything reads the environment
    let dotenv = dotenvy::dotenv();

    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!(dotenv_loaded = dotenv.is_ok(), "relay_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        verify_token_configured = std::env::var("META_VERIFY_TOKEN").is_ok(),
        access_token_configured = config.access_token.is_some(),
        phone_number_id_configured = config.phone_number_id.is_some(),
        graph_api_base_url = %config.graph_api_base_url,
        upload_dir = %config.upload_dir.display(),
        "config_loaded"
    );

    if config.relay_credentials().is_none() {
        warn!("media_relay_not_configured");
    }
    if config.recipient.is_empty() {
        warn!("relay_recipient_not_configured");
    }

    // Create Graph API client
    let api = GraphClient::from_config(&config).context("Failed to create HTTP client")?;

    // Create application state and router
    let port = config.port;
    let state = AppState::new(config, Arc::new(api));
    let app = router(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "relay_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("relay_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("relay_shutting_down");
}
