//! Prediction request/response types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PredictError;

/// Inbound prediction request
///
/// Missing fields deserialize to empty values so that they are reported by
/// [`PredictionRequest::validate`] instead of failing JSON decoding.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictionRequest {
    #[serde(default)]
    pub model_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default)]
    pub features: Vec<f64>,
}

impl PredictionRequest {
    pub fn new(model_id: impl Into<String>, features: Vec<f64>) -> Self {
        Self {
            model_id: model_id.into(),
            request_id: None,
            features,
        }
    }

    /// Attach a caller-supplied request id
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Check the request shape. `model_id` is checked before `features`.
    pub fn validate(&self) -> Result<(), PredictError> {
        if self.model_id.is_empty() {
            return Err(PredictError::validation("model_id", "model_id is required"));
        }
        if self.features.is_empty() {
            return Err(PredictError::validation(
                "features",
                "features cannot be empty",
            ));
        }
        Ok(())
    }
}

/// Outbound prediction response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub model_id: String,
    pub request_id: String,
    /// Duration of the predictor call only
    pub latency_ms: f64,
    pub prediction: Vec<f64>,
    pub timestamp: DateTime<Utc>,
    /// Reserved; no current backend reports a confidence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Descriptive model information, fixed at predictor construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub id: String,
    pub name: String,
    pub version: String,
    pub path: String,
}
