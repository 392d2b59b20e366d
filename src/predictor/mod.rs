//! Inference backends
//!
//! Every backend implements [`Predictor`]. Which one serves a model is
//! decided once, at startup, by [`build_predictor`] from the model's
//! configuration; nothing above this module branches on the backend.
//!
//! - [`OnnxPredictor`]: ONNX graph executed by tract, calls serialized
//!   through a per-instance lock (requires the `onnx` feature)
//! - [`StubPredictor`]: deterministic threshold classifier with a short
//!   simulated delay, for running the pipeline without a model artifact

#[cfg(feature = "onnx")]
mod onnx;
mod stub;

#[cfg(feature = "onnx")]
pub use onnx::OnnxPredictor;
pub use stub::StubPredictor;

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::{Backend, ModelConfig};
use crate::domain::{ModelMetadata, PredictError};

/// Input arity of the reference iris deployment
pub const DEFAULT_INPUT_SIZE: usize = 4;

/// Tensor names skl2onnx gives a classifier's feature input and label output
pub const DEFAULT_INPUT_NAME: &str = "X";
pub const DEFAULT_OUTPUT_NAME: &str = "output_label";

/// Capability contract for inference backends
#[async_trait]
pub trait Predictor: Send + Sync {
    /// Run inference on one feature vector.
    ///
    /// Fails with [`PredictError::InvalidInput`] when `features` does not
    /// match [`Predictor::input_size`], and with [`PredictError::Cancelled`]
    /// if `cancel` fires before or while the call is blocked.
    async fn predict(
        &self,
        features: &[f64],
        cancel: &CancellationToken,
    ) -> Result<Vec<f64>, PredictError>;

    /// Model metadata
    fn metadata(&self) -> &ModelMetadata;

    /// Number of features a single prediction expects
    fn input_size(&self) -> usize;

    /// Backend name reported by the models endpoint
    fn backend(&self) -> &'static str;

    /// Release the backing resource. Safe to call more than once.
    async fn close(&self) -> Result<(), PredictError>;
}

/// Shared predictor handle as stored in the registry
pub type SharedPredictor = Arc<dyn Predictor>;

/// Build the predictor described by `config`
pub fn build_predictor(config: &ModelConfig) -> Result<SharedPredictor, PredictError> {
    let metadata = ModelMetadata {
        id: config.id.clone(),
        name: config.name.clone(),
        version: config.version.clone(),
        path: config.path.to_string_lossy().into_owned(),
    };

    match config.backend {
        Backend::Stub => Ok(Arc::new(StubPredictor::new(metadata, config.input_size)?)),
        #[cfg(feature = "onnx")]
        Backend::Onnx => Ok(Arc::new(OnnxPredictor::new(
            metadata,
            config.input_size,
            &config.input_name,
            &config.output_name,
        )?)),
        #[cfg(not(feature = "onnx"))]
        Backend::Onnx => Err(PredictError::Configuration(format!(
            "model '{}' uses the onnx backend but irisd was built without the 'onnx' feature",
            config.id
        ))),
    }
}

/// Reject construction with missing identity fields
pub(crate) fn check_metadata(
    metadata: &ModelMetadata,
    needs_path: bool,
) -> Result<(), PredictError> {
    let missing_path = needs_path && metadata.path.is_empty();
    if metadata.id.is_empty() || metadata.name.is_empty() || missing_path {
        return Err(PredictError::Configuration(
            "id, name, and path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Reject a feature vector of the wrong length
pub(crate) fn check_arity(expected: usize, features: &[f64]) -> Result<(), PredictError> {
    if features.len() != expected {
        return Err(PredictError::InvalidInput {
            expected,
            actual: features.len(),
        });
    }
    Ok(())
}

/// Fail fast when the caller has already given up
pub(crate) fn check_cancelled(cancel: &CancellationToken) -> Result<(), PredictError> {
    if cancel.is_cancelled() {
        return Err(PredictError::Cancelled);
    }
    Ok(())
}
