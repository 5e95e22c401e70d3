//! Tokenmeter API Server
//!
//! HTTP gateway that forwards text and file uploads to external
//! token-counting vendors and normalizes their responses.

use std::net::SocketAddr;

use tokenmeter_api::{bootstrap, routes};
use tracing::info;

type MainResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> MainResult {
    // Initialize environment (load .env, etc.)
    tokenmeter_common::initialize_environment();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("Starting Tokenmeter API server...");

    // Load and validate configuration - a missing primary vendor
    // credential refuses to start here
    let config = bootstrap::load_config()?;
    info!("Configuration loaded and validated");

    // Wire up vendor clients and the normalization gateway
    let state = bootstrap::setup_app_state(&config)?;

    // Create router
    let app = routes::create_router(state);

    // Bind to address
    let addr: SocketAddr = format!("{}:{}", config.api.host, config.api.port).parse()?;
    info!("Listening on {}", addr);

    // Start server using axum's serve function
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
