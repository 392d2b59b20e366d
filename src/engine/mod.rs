//! Core serving pipeline
//!
//! - ModelRegistry: id → predictor lookup, populated at startup
//! - PredictionService: validation, dispatch, timing for one request

mod registry;
mod service;

pub use registry::ModelRegistry;
pub use service::{PredictionObserver, PredictionService};

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::ServingConfig;
use crate::predictor::build_predictor;

/// Build and register every model in `config`
///
/// Any model that fails to load aborts the whole startup.
pub async fn load_registry(config: &ServingConfig) -> Result<Arc<ModelRegistry>> {
    let registry = Arc::new(ModelRegistry::new());

    for model in &config.models {
        tracing::info!(
            model_id = %model.id,
            backend = %model.backend,
            path = %model.path.display(),
            "Loading model"
        );
        let predictor = build_predictor(model)
            .with_context(|| format!("failed to load model '{}'", model.id))?;
        registry
            .register(model.id.clone(), predictor)
            .await
            .with_context(|| format!("failed to register model '{}'", model.id))?;
    }

    Ok(registry)
}
