use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use bucket_filler::config::Config;
use bucket_filler::coordinator::Coordinator;
use bucket_filler::handler::router;
use shared::s3::S3Store;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            shared::log::init(tracing::Level::INFO);
            error!("{}", e);
            return Err(e.into());
        }
    };
    shared::log::init(config.log_level);

    info!("Starting server and writing to {}", config.bucket_name);

    let store = S3Store::from_env(config.endpoint_url.as_deref()).await;
    let coordinator = Coordinator::new(Arc::new(store), config.bucket_name.as_str())
        .with_object_size(config.object_size)
        .with_write_timeout(config.write_timeout);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Starting server on port {}", config.port);

    axum::serve(listener, router(coordinator))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failed")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
