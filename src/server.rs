//! HTTP server: routes, shared state, graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use tracing::info;

use astrobit_pipeline::ModelArtifacts;

use crate::handlers;

/// State shared by every request. Artifacts are read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub artifacts: Arc<ModelArtifacts>,
}

impl AppState {
    pub fn new(artifacts: ModelArtifacts) -> Self {
        Self {
            artifacts: Arc::new(artifacts),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(handlers::predict))
        .route("/decision_path", post(handlers::decision_path))
        .route("/general_tree_image", get(handlers::general_tree_image))
        .route("/random_tree_image", get(handlers::random_tree))
        .route("/model_metrics", get(handlers::model_metrics))
        .route("/health", get(handlers::health))
        .route("/trace", post(handlers::trace))
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %listener.local_addr().unwrap_or(addr), "listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}
