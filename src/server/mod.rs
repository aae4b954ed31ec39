//! HTTP server hosting the recipe endpoint
//!
//! Routes:
//! - `POST /api/get-recipes`: ingredient list in, recipe texts out
//! - `GET /images/:file`: stored item photos
//! - `GET /health`: liveness

use crate::config::Config;
use crate::error::{PantryError, Result};
use crate::providers::create_provider;
use crate::recipes::RecipeService;
use crate::storage::{BlobStore, FsBlobStore};
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;

pub mod handlers;

/// Shared state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    pub recipes: Arc<RecipeService>,
    pub blobs: Arc<dyn BlobStore>,
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/get-recipes",
            post(handlers::get_recipes).fallback(handlers::method_not_allowed),
        )
        .route("/images/:file", get(handlers::get_image))
        .route("/health", get(handlers::health))
        .with_state(state)
}

/// Run the recipe server until Ctrl-C
///
/// # Errors
///
/// Returns error if the provider or blob store cannot be created or the
/// bind address is unavailable
pub async fn serve(config: &Config) -> Result<()> {
    let provider = create_provider(&config.provider)?;
    let blobs = FsBlobStore::new(
        config.storage.resolved_blob_dir()?,
        config.storage.public_base_url.clone(),
    )?;

    let state = AppState {
        recipes: Arc::new(RecipeService::new(Arc::from(provider))),
        blobs: Arc::new(blobs),
    };

    let addr: SocketAddr = config.server.bind.parse().map_err(|e| {
        PantryError::Config(format!("Invalid bind address {}: {}", config.server.bind, e))
    })?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| PantryError::Config(format!("Failed to bind to {}: {}", addr, e)))?;

    tracing::info!("Starting recipe server on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(PantryError::Io)?;

    tracing::info!("Recipe server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
