//! Liveness endpoint for hosting-platform port-binding checks

use anyhow::{Context, Result};
use axum::Router;

/// Serve `200 OK` with body `OK` for any path and method, forever.
/// Fully independent of chat state.
pub async fn serve(port: u16) -> Result<()> {
    let app = Router::new().fallback(|| async { "OK" });

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind health port {}", port))?;

    tracing::info!(port, "Health endpoint listening");

    axum::serve(listener, app)
        .await
        .context("Health endpoint stopped unexpectedly")
}
