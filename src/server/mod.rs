//! HTTP/WebSocket transport
//!
//! Thin layer over the aggregator: a paginated read endpoint, a health
//! report, and a WebSocket that forwards broadcast events. Server lifecycle
//! is bind, serve, graceful shutdown on ctrl-c.

pub mod routes;
pub mod ws;

use crate::aggregator::Aggregator;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

/// Binds the listener and serves until shutdown.
///
/// This function blocks until the server stops.
pub async fn serve(aggregator: Arc<Aggregator>, port: u16) -> std::io::Result<()> {
    let app = routes::create_router(aggregator).layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
