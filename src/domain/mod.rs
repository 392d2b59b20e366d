//! Request, response and error types shared by the serving pipeline.

mod error;
mod prediction;

pub use error::{PredictError, RegistryError};
pub use prediction::{ModelMetadata, PredictionRequest, PredictionResponse};
