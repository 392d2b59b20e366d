//! HTTP request handlers
//!
//! Thin adapters: decode, call the prediction service, and translate its
//! typed errors into status codes.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Json, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::metrics::Metrics;
use super::middleware::{RequestId, REQUEST_ID_HEADER};
use crate::domain::{ModelMetadata, PredictError, PredictionRequest};
use crate::engine::{ModelRegistry, PredictionService};

/// Shared application state
pub struct AppState {
    pub service: PredictionService,
    pub registry: Arc<ModelRegistry>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// Wire a service over `registry` that reports to `metrics`
    pub fn new(registry: Arc<ModelRegistry>, metrics: Arc<Metrics>) -> Self {
        let service = PredictionService::new(Arc::clone(&registry)).with_observer(metrics.clone());
        Self {
            service,
            registry,
            metrics,
        }
    }
}

/// Status code a caller sees for each error kind
pub fn error_status(err: &PredictError) -> StatusCode {
    match err {
        PredictError::Validation { .. } | PredictError::InvalidInput { .. } => {
            StatusCode::BAD_REQUEST
        }
        PredictError::ModelNotFound(_) => StatusCode::NOT_FOUND,
        PredictError::Prediction { .. }
        | PredictError::Cancelled
        | PredictError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(status: StatusCode, message: String, r#type: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: ErrorDetail {
                message,
                r#type: r#type.to_string(),
            },
        }),
    )
        .into_response()
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            timestamp: Utc::now(),
        }),
    )
}

/// List registered models
pub async fn list_models(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let models = state.registry.list().await;
    let response = ModelsResponse {
        count: models.len(),
        models,
    };
    (StatusCode::OK, Json(response))
}

/// Describe one registered model
pub async fn get_model(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.registry.get(&id).await {
        Ok(predictor) => {
            let response = ModelInfo {
                metadata: predictor.metadata().clone(),
                backend: predictor.backend().to_string(),
                input_size: predictor.input_size(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(error_status(&e), e.to_string(), "invalid_request_error"),
    }
}

/// Prediction endpoint
pub async fn predict(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    body: Result<Json<PredictionRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "JSON decode error");
            return error_response(
                StatusCode::BAD_REQUEST,
                "Invalid JSON".to_string(),
                "invalid_request_error",
            );
        }
    };

    // Fires if the client goes away and this future is dropped mid-inference
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let model_id = request.model_id.clone();
    match state
        .service
        .predict_with_request_id(request, Some(&request_id), &cancel)
        .await
    {
        Ok(response) => {
            // The body may carry its own id; the header must agree with it
            let echoed = HeaderValue::from_str(&response.request_id);
            let mut http = (StatusCode::OK, Json(response)).into_response();
            if let Ok(value) = echoed {
                http.headers_mut().insert(REQUEST_ID_HEADER.clone(), value);
            }
            http
        }
        Err(e) => {
            let status = error_status(&e);
            if status.is_server_error() {
                tracing::error!(
                    request_id = %request_id,
                    model_id = %model_id,
                    kind = e.kind(),
                    error = ?e,
                    "Prediction failed"
                );
                error_response(status, "Internal server error".to_string(), "server_error")
            } else {
                tracing::info!(
                    request_id = %request_id,
                    model_id = %model_id,
                    error = %e,
                    "Prediction rejected"
                );
                error_response(status, e.to_string(), "invalid_request_error")
            }
        }
    }
}

/// Prometheus scrape endpoint
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.to_prometheus_format(),
    )
}

// Request/Response types

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<String>,
    pub count: usize,
}

#[derive(Serialize, Deserialize)]
pub struct ModelInfo {
    #[serde(flatten)]
    pub metadata: ModelMetadata,
    pub backend: String,
    pub input_size: usize,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
}
