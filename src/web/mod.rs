//! Web server module.
//!
//! Ingest API through which the check runner hands over its results, plus a
//! few administrative pass-through routes.

mod handlers;

pub use handlers::*;

use crate::config::ServerConfig;
use crate::reconcile::Reconciler;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub reconciler: Reconciler,
}

/// Web server for statusward.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a new server with the given dependencies.
    pub fn new(config: ServerConfig, reconciler: Reconciler) -> Self {
        Self {
            state: AppState { config, reconciler },
        }
    }

    /// Build the router with all routes.
    fn routes(&self) -> Router {
        Router::new()
            .route("/health", get(handlers::handle_health))
            // Ingest
            .route("/api/iterations", post(handlers::handle_reconcile_iteration))
            .route("/api/results", post(handlers::handle_reconcile_result))
            // Administration
            .route("/api/components/{id}", get(handlers::handle_get_component))
            .route("/api/components/{id}", delete(handlers::handle_delete_component))
            .route("/api/incidents/{id}", delete(handlers::handle_delete_incident))
            .layer(TraceLayer::new_for_http())
            .layer(DefaultBodyLimit::max(1024 * 1024)) // 1MB
            .with_state(self.state.clone())
    }

    /// Start the server on the configured port.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.state.config.http_port));
        let router = self.routes();

        tracing::info!("Web server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}
