//! HTTP server command

use std::path::PathBuf;

use anyhow::Result;

use crate::config::ServingConfig;
use crate::engine::load_registry;
use crate::server;

/// Start the inference server
pub async fn serve(
    config: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    stub: bool,
) -> Result<()> {
    let mut config = ServingConfig::load_or_default(config.as_deref())?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if stub {
        tracing::info!("Using stub backend for all models");
        config.use_stub_backend();
    }

    // A model that cannot be loaded is fatal
    let registry = load_registry(&config).await?;
    tracing::info!("Loaded {} model(s)", registry.len().await);

    let result = server::start(registry.clone(), config.server.clone(), shutdown_signal()).await;

    tracing::info!("Shutting down server...");
    registry.close_all().await;

    result
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
