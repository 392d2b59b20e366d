//! ONNX backend
//!
//! Runs an ONNX graph through tract. The plan is not shared between
//! predictors, and calls on one predictor are serialized by its lock: a
//! second request for the same model waits for the first to finish.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tract_onnx::prelude::*;

use super::{check_arity, check_cancelled, check_metadata, Predictor};
use crate::domain::{ModelMetadata, PredictError};

/// Optimized, runnable tract plan
type OnnxPlan = TypedRunnableModel<TypedModel>;

/// Predictor backed by an ONNX model
pub struct OnnxPredictor {
    metadata: ModelMetadata,
    /// `[1, input_size]`, fixed at load time
    input_shape: [usize; 2],
    /// `None` once closed
    session: Arc<Mutex<Option<OnnxPlan>>>,
}

impl OnnxPredictor {
    /// Load and optimize the model at `metadata.path`
    ///
    /// `input_name` is pinned to `f32[1, input_size]` and `output_name`
    /// becomes the only graph output. Anything feeding only the other
    /// outputs (such as the `ZipMap` probability head skl2onnx emits) is
    /// dropped, so it never has to be supported.
    pub fn new(
        metadata: ModelMetadata,
        input_size: usize,
        input_name: &str,
        output_name: &str,
    ) -> Result<Self, PredictError> {
        check_metadata(&metadata, true)?;
        if input_size == 0 {
            return Err(PredictError::Configuration(format!(
                "model '{}': input_size must be positive",
                metadata.id
            )));
        }

        let input_shape = [1, input_size];
        let plan = load_plan(
            Path::new(&metadata.path),
            input_name,
            output_name,
            input_shape,
        )
        .map_err(|e| {
            PredictError::Configuration(format!(
                "failed to load ONNX model '{}' from {}: {:#}",
                metadata.id, metadata.path, e
            ))
        })?;

        tracing::debug!(
            model_id = %metadata.id,
            path = %metadata.path,
            input = input_name,
            output = output_name,
            "ONNX session created"
        );

        Ok(Self {
            metadata,
            input_shape,
            session: Arc::new(Mutex::new(Some(plan))),
        })
    }
}

fn load_plan(
    path: &Path,
    input_name: &str,
    output_name: &str,
    input_shape: [usize; 2],
) -> TractResult<OnnxPlan> {
    tract_onnx::onnx()
        .model_for_path(path)?
        .with_input_names([input_name])?
        .with_output_names([output_name])?
        .with_input_fact(0, f32::fact(input_shape).into())?
        .into_optimized()?
        .into_runnable()
}

/// Run one `[1, N]` inference and widen the selected output to f64
fn run_plan(
    plan: &OnnxPlan,
    input_shape: [usize; 2],
    features: &[f32],
) -> TractResult<Vec<f64>> {
    let input = Tensor::from_shape(&input_shape, features)?;
    let outputs = plan.run(tvec!(input.into()))?;
    let output = outputs
        .first()
        .ok_or_else(|| TractError::msg("model produced no outputs"))?;
    // Classifiers exported from sklearn emit i64 labels
    let values = output.cast_to::<f32>()?;
    Ok(values.as_slice::<f32>()?.iter().map(|v| *v as f64).collect())
}

#[async_trait]
impl Predictor for OnnxPredictor {
    async fn predict(
        &self,
        features: &[f64],
        cancel: &CancellationToken,
    ) -> Result<Vec<f64>, PredictError> {
        check_arity(self.input_shape[1], features)?;
        check_cancelled(cancel)?;

        let guard = tokio::select! {
            _ = cancel.cancelled() => return Err(PredictError::Cancelled),
            guard = Arc::clone(&self.session).lock_owned() => guard,
        };
        check_cancelled(cancel)?;

        let features: Vec<f32> = features.iter().map(|v| *v as f32).collect();
        let input_shape = self.input_shape;
        let model_id = self.metadata.id.clone();

        // The guard moves into the blocking task so the session stays locked
        // until inference returns, even if this caller stops waiting.
        let task = tokio::task::spawn_blocking(move || {
            let plan = guard
                .as_ref()
                .ok_or_else(|| PredictError::prediction(&model_id, "session closed"))?;
            run_plan(plan, input_shape, &features)
                .map_err(|e| PredictError::prediction(&model_id, e))
        });

        let output = tokio::select! {
            _ = cancel.cancelled() => return Err(PredictError::Cancelled),
            joined = task => joined.map_err(|e| PredictError::prediction(&self.metadata.id, e))??,
        };
        check_cancelled(cancel)?;

        Ok(output)
    }

    fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    fn input_size(&self) -> usize {
        self.input_shape[1]
    }

    fn backend(&self) -> &'static str {
        "onnx"
    }

    async fn close(&self) -> Result<(), PredictError> {
        let mut session = self.session.lock().await;
        if session.take().is_some() {
            tracing::debug!(model_id = %self.metadata.id, "ONNX session released");
        }
        Ok(())
    }
}
