//! Error taxonomy for the serving pipeline
//!
//! Every per-request failure is a [`PredictError`] variant. The transport
//! layer decides which status code and message a caller sees; nothing in
//! here knows about HTTP.

use thiserror::Error;

/// Boxed backend error kept for logging
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced while serving a prediction or constructing a predictor
#[derive(Debug, Error)]
pub enum PredictError {
    /// The request itself is malformed and never reached a model
    #[error("Validation error [{field}]: {message}")]
    Validation { field: String, message: String },

    /// No model is registered under this id
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// Feature vector length does not match the model's input arity
    #[error("invalid input: expected {expected} features, got {actual}")]
    InvalidInput { expected: usize, actual: usize },

    /// The inference backend failed
    #[error("prediction failed for model {model_id}")]
    Prediction {
        model_id: String,
        #[source]
        cause: BoxError,
    },

    /// The caller withdrew the request
    #[error("prediction cancelled")]
    Cancelled,

    /// Predictor construction failed. Startup only.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl PredictError {
    pub fn validation(field: &str, message: &str) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn prediction(model_id: &str, cause: impl Into<BoxError>) -> Self {
        Self::Prediction {
            model_id: model_id.to_string(),
            cause: cause.into(),
        }
    }

    /// Short machine-readable name of the error kind, used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::ModelNotFound(_) => "model_not_found",
            Self::InvalidInput { .. } => "invalid_input",
            Self::Prediction { .. } => "prediction",
            Self::Cancelled => "cancelled",
            Self::Configuration(_) => "configuration",
        }
    }
}

/// Errors returned by the model registry on registration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("model already registered: {0}")]
    Duplicate(String),
}
