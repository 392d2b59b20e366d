//! One-shot prediction command

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use tokio_util::sync::CancellationToken;

use crate::config::ServingConfig;
use crate::domain::PredictionRequest;
use crate::engine::{load_registry, PredictionService};

/// Load the configured models, run one prediction and print it as JSON
pub async fn predict(
    model: String,
    features: Vec<f64>,
    config: Option<PathBuf>,
    stub: bool,
) -> Result<()> {
    let mut config = ServingConfig::load_or_default(config.as_deref())?;
    if config.model(&model).is_none() {
        return Err(anyhow!("Model not configured: {}", model));
    }
    // Only the requested model is loaded
    config.models.retain(|m| m.id == model);
    if stub {
        config.use_stub_backend();
    }

    let registry = load_registry(&config).await?;
    let service = PredictionService::new(registry.clone());

    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let result = service
        .predict(PredictionRequest::new(model, features), &cancel)
        .await;
    registry.close_all().await;

    let response = result?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
