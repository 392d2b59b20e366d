//! Rule-based stand-in for a trained model

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio_util::sync::CancellationToken;

use super::{check_arity, check_cancelled, check_metadata, Predictor};
use crate::domain::{ModelMetadata, PredictError};

/// Simulated processing delay bounds, in milliseconds
const MIN_DELAY_MS: u64 = 1;
const MAX_DELAY_MS: u64 = 10;

/// Class boundaries on the first feature (iris sepal length)
const FIRST_BOUNDARY: f64 = 5.5;
const SECOND_BOUNDARY: f64 = 6.5;

/// Deterministic three-class classifier with a short random delay
///
/// Used to exercise the serving pipeline end to end without a model
/// artifact. The output depends only on the first feature:
///
/// | first feature | class |
/// |---------------|-------|
/// | `< 5.5`       | 0.0   |
/// | `< 6.5`       | 1.0   |
/// | otherwise     | 2.0   |
pub struct StubPredictor {
    metadata: ModelMetadata,
    input_size: usize,
}

impl StubPredictor {
    pub fn new(metadata: ModelMetadata, input_size: usize) -> Result<Self, PredictError> {
        check_metadata(&metadata, false)?;
        if input_size == 0 {
            return Err(PredictError::Configuration(format!(
                "model '{}': input_size must be positive",
                metadata.id
            )));
        }
        Ok(Self {
            metadata,
            input_size,
        })
    }

    fn classify(first: f64) -> f64 {
        if first < FIRST_BOUNDARY {
            0.0
        } else if first < SECOND_BOUNDARY {
            1.0
        } else {
            2.0
        }
    }
}

#[async_trait]
impl Predictor for StubPredictor {
    async fn predict(
        &self,
        features: &[f64],
        cancel: &CancellationToken,
    ) -> Result<Vec<f64>, PredictError> {
        check_arity(self.input_size, features)?;
        check_cancelled(cancel)?;

        let delay_ms = rand::thread_rng().gen_range(MIN_DELAY_MS..=MAX_DELAY_MS);
        let delay = Duration::from_millis(delay_ms);
        tokio::select! {
            _ = cancel.cancelled() => return Err(PredictError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }

        Ok(vec![Self::classify(features[0])])
    }

    fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    fn input_size(&self) -> usize {
        self.input_size
    }

    fn backend(&self) -> &'static str {
        "stub"
    }

    async fn close(&self) -> Result<(), PredictError> {
        Ok(())
    }
}
