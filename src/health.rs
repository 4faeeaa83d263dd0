//! HTTP healthcheck for the hosting platform.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use tracing::info;

async fn root() -> &'static str {
    "Farm storefront bot is running"
}

async fn health() -> &'static str {
    "OK"
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
}

/// Serve the healthcheck until the process exits
pub async fn serve(port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind healthcheck port {port}"))?;
    info!(%addr, "Healthcheck listening");
    axum::serve(listener, router())
        .await
        .context("Healthcheck server stopped")
}
