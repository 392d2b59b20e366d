//! Per-model settings

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::predictor::{DEFAULT_INPUT_NAME, DEFAULT_INPUT_SIZE, DEFAULT_OUTPUT_NAME};

/// Inference backend serving a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// ONNX graph executed natively
    #[default]
    Onnx,
    /// Threshold classifier, no artifact needed
    Stub,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Onnx => write!(f, "onnx"),
            Backend::Stub => write!(f, "stub"),
        }
    }
}

/// One model to load at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Registry key, used as `model_id` in requests
    pub id: String,

    /// Human-readable name
    pub name: String,

    #[serde(default)]
    pub version: String,

    /// Model artifact (ignored by the stub backend)
    #[serde(default)]
    pub path: PathBuf,

    #[serde(default)]
    pub backend: Backend,

    /// Number of features per prediction
    #[serde(default = "default_input_size")]
    pub input_size: usize,

    /// Graph input fed with the feature vector (onnx backend)
    #[serde(default = "default_input_name")]
    pub input_name: String,

    /// Graph output read as the prediction (onnx backend). Other outputs
    /// are pruned before the graph is optimized.
    #[serde(default = "default_output_name")]
    pub output_name: String,
}

fn default_input_size() -> usize {
    DEFAULT_INPUT_SIZE
}

fn default_input_name() -> String {
    DEFAULT_INPUT_NAME.to_string()
}

fn default_output_name() -> String {
    DEFAULT_OUTPUT_NAME.to_string()
}

impl ModelConfig {
    /// The reference iris classifier
    pub fn iris() -> Self {
        Self {
            id: "iris_v1".to_string(),
            name: "Iris Classifier".to_string(),
            version: "v1.0.0".to_string(),
            path: PathBuf::from("models/iris_classifier_v1.onnx"),
            backend: Backend::Onnx,
            input_size: DEFAULT_INPUT_SIZE,
            input_name: default_input_name(),
            output_name: default_output_name(),
        }
    }
}
