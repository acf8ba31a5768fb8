//! HTTP server lifecycle.
//!
//! [`start_server`] binds a TCP listener and serves the router until
//! `Ctrl-C` is received, then drains in-flight requests.

use std::net::SocketAddr;
use std::sync::Arc;

use relief_core::config::ServerConfig;
use tokio::net::TcpListener;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// Errors that can occur when starting or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}

/// Start the operations API server.
///
/// # Errors
///
/// Returns [`ServeError::Bind`] if the address is invalid or cannot be
/// bound, or [`ServeError::Serve`] on a fatal I/O error.
pub async fn start_server(config: &ServerConfig, state: Arc<AppState>) -> Result<(), ServeError> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| ServeError::Bind(format!("invalid address: {e}")))?;

    let router = build_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServeError::Bind(format!("bind failed on {addr}: {e}")))?;

    info!(%addr, "Operations API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServeError::Serve(format!("serve error: {e}")))?;

    info!("Operations API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C; serving until killed");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
