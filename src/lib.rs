//! irisd - inference server for tabular models
//!
//! irisd loads a fixed set of models at startup and serves predictions for
//! them over HTTP. Each request carries a feature vector and the id of the
//! model to run it through; the response carries the prediction vector and
//! the time spent in inference.
//!
//! # Architecture
//!
//! - **predictor**: inference backends behind one trait (ONNX via tract, stub)
//! - **engine**: model registry and the prediction service
//! - **server**: axum adapter, request ids, metrics
//! - **cli**: `serve`, `predict` and `list` commands
//!
//! # Example
//!
//! ```bash
//! # Start server with the models from a config file
//! irisd serve --config irisd.yaml --port 8080
//!
//! # Run one prediction without a model artifact
//! irisd predict --model iris_v1 --features 5.1,3.5,1.4,0.2 --stub
//!
//! # List configured models
//! irisd list --verbose
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod predictor;
pub mod server;

// Re-export key types
pub use config::{Backend, ModelConfig, ServerConfig, ServingConfig};
pub use domain::{ModelMetadata, PredictError, PredictionRequest, PredictionResponse};
pub use engine::{ModelRegistry, PredictionService};
pub use predictor::{build_predictor, Predictor, StubPredictor};
