//! MailRelay Web Server - HTTP batch invocation endpoint.
//!
//! This binary accepts a whole batch event (`{"Records": [...]}`) on
//! `POST /invoke`, dispatches every record as email, and returns the fixed
//! invocation response.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mailrelay::shutdown::shutdown_signal;
use mailrelay::web::{health, invoke, AppState};
use mailrelay::{BatchProcessor, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        invoke_auth_configured = config.invoke_auth_token.is_some(),
        smtp_host_set = !config.smtp.host.is_empty(),
        smtp_port = config.smtp.port,
        "config_loaded"
    );

    let processor = BatchProcessor::from_config(config.smtp.clone());
    let state = AppState::new(config.clone(), processor);

    // Build the router
    let app = Router::new()
        .route("/health", get(health))
        .route("/invoke", post(invoke))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            info!("web_server_shutting_down");
        })
        .await
        .context("Server error")?;

    info!("web_server_shutdown_complete");

    Ok(())
}
