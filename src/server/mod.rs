//! HTTP server for inference
//!
//! Exposes the prediction service as a small JSON API.

mod handlers;
mod metrics;
mod middleware;
mod routes;

use std::sync::Arc;

use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::engine::ModelRegistry;

pub use handlers::{error_status, AppState};
pub use metrics::Metrics;
pub use middleware::{RequestId, REQUEST_ID_HEADER};
pub use routes::api_routes;

/// Assemble the full application router with all middleware
pub fn app(state: Arc<AppState>, config: &ServerConfig) -> Router {
    let mut router = api_routes()
        .layer(DefaultBodyLimit::max(config.max_body_size))
        .layer(axum::middleware::from_fn(middleware::request_id))
        .layer(axum::middleware::from_fn_with_state(
            Arc::clone(&state.metrics),
            metrics::track_http,
        ));

    if config.cors_enabled {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any);
        router = router.layer(cors);
    }

    if config.request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

/// Start the HTTP inference server and run until `shutdown` resolves
pub async fn start<F>(registry: Arc<ModelRegistry>, config: ServerConfig, shutdown: F) -> Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let state = Arc::new(AppState::new(registry, Arc::new(Metrics::new())));
    let app = app(state, &config);

    let addr = config.addr();
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("API endpoints:");
    tracing::info!("  POST /predict - Run a prediction");
    tracing::info!("  GET  /models - List models");
    tracing::info!("  GET  /models/:id - Model details");
    tracing::info!("  GET  /health - Health check");
    tracing::info!("  GET  /metrics - Prometheus metrics");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
