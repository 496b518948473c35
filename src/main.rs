//! statusward daemon.
//!
//! Receives check results over HTTP and reconciles them into the status page.

use statusward::web::Server;
use statusward::{Reconciler, ServerConfig};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("statusward=info".parse()?))
        .init();

    // Load configuration
    let cfg = ServerConfig::load();
    tracing::info!("Starting statusward on port {}...", cfg.http_port);

    let integration = cfg.integration_builder()?.build()?;
    tracing::info!(
        "Reconciling into {} (strict mode: {})",
        integration.connection.api_url,
        integration.connection.fail_fast
    );
    if let Some(deadline) = cfg.batch_deadline {
        tracing::info!("Batch deadline set to {:?}", deadline);
    }

    let reconciler = Reconciler::new(integration);

    // Start web server
    let server = Server::new(cfg, reconciler);
    server.start().await?;

    Ok(())
}
