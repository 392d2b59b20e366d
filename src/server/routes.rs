//! Route definitions

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{get_model, health, list_models, metrics, predict, AppState};

/// Create the API router
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Health check
        .route("/health", get(health))
        // Model introspection
        .route("/models", get(list_models))
        .route("/models/:id", get(get_model))
        // Inference
        .route("/predict", post(predict))
        // Prometheus scrape
        .route("/metrics", get(metrics))
}
