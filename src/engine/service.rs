//! Prediction service
//!
//! Runs one prediction: validate, resolve the request id, look the model up,
//! time the predictor call and assemble the response. The service holds no
//! locks of its own; contention lives in the registry and the predictors.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use super::ModelRegistry;
use crate::domain::{PredictError, PredictionRequest, PredictionResponse};

/// Side-channel notified after every predictor call
///
/// Observers see the outcome but cannot change it.
pub trait PredictionObserver: Send + Sync {
    fn observe(&self, model_id: &str, outcome: &Result<PredictionResponse, PredictError>);
}

/// Stateless prediction pipeline over a [`ModelRegistry`]
#[derive(Clone)]
pub struct PredictionService {
    registry: Arc<ModelRegistry>,
    observer: Option<Arc<dyn PredictionObserver>>,
}

impl PredictionService {
    /// Create a service over `registry`
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self {
            registry,
            observer: None,
        }
    }

    /// Report outcomes to `observer`
    pub fn with_observer(mut self, observer: Arc<dyn PredictionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// The registry this service resolves models from
    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Serve one prediction, generating a request id if the caller gave none
    pub async fn predict(
        &self,
        request: PredictionRequest,
        cancel: &CancellationToken,
    ) -> Result<PredictionResponse, PredictError> {
        self.predict_with_request_id(request, None, cancel).await
    }

    /// Serve one prediction
    ///
    /// The response's request id is, in order of preference: the id in the
    /// request body, `fallback_id` (typically from the transport layer), or a
    /// fresh UUID.
    pub async fn predict_with_request_id(
        &self,
        request: PredictionRequest,
        fallback_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<PredictionResponse, PredictError> {
        request.validate()?;

        let PredictionRequest {
            model_id,
            request_id,
            features,
        } = request;

        let request_id = request_id
            .filter(|id| !id.is_empty())
            .or_else(|| fallback_id.filter(|id| !id.is_empty()).map(str::to_owned))
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let predictor = self.registry.get(&model_id).await?;

        let start = Instant::now();
        let result = predictor.predict(&features, cancel).await;
        let elapsed = start.elapsed();

        let outcome = result.map(|prediction| PredictionResponse {
            latency_ms: elapsed.as_micros() as f64 / 1000.0,
            model_id: model_id.clone(),
            request_id: request_id.clone(),
            prediction,
            timestamp: Utc::now(),
            confidence: None,
        });

        match &outcome {
            Ok(response) => tracing::debug!(
                request_id = %request_id,
                model_id = %model_id,
                latency_ms = response.latency_ms,
                "Prediction served"
            ),
            Err(e) => tracing::debug!(
                request_id = %request_id,
                model_id = %model_id,
                kind = e.kind(),
                "Prediction failed"
            ),
        }

        if let Some(observer) = &self.observer {
            observer.observe(&model_id, &outcome);
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::domain::ModelMetadata;
    use crate::predictor::{Predictor, StubPredictor};

    /// Echoes its input and counts calls
    struct SpyPredictor {
        metadata: ModelMetadata,
        calls: AtomicUsize,
    }

    impl SpyPredictor {
        fn new(id: &str) -> Self {
            Self {
                metadata: ModelMetadata {
                    id: id.to_string(),
                    name: "spy".to_string(),
                    version: "v0".to_string(),
                    path: String::new(),
                },
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Predictor for SpyPredictor {
        async fn predict(
            &self,
            features: &[f64],
            cancel: &CancellationToken,
        ) -> Result<Vec<f64>, PredictError> {
            if cancel.is_cancelled() {
                return Err(PredictError::Cancelled);
            }
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(features.to_vec())
        }

        fn metadata(&self) -> &ModelMetadata {
            &self.metadata
        }

        fn input_size(&self) -> usize {
            4
        }

        fn backend(&self) -> &'static str {
            "spy"
        }

        async fn close(&self) -> Result<(), PredictError> {
            Ok(())
        }
    }

    /// Always fails like a broken backend
    struct FailingPredictor(ModelMetadata);

    #[async_trait]
    impl Predictor for FailingPredictor {
        async fn predict(
            &self,
            _features: &[f64],
            _cancel: &CancellationToken,
        ) -> Result<Vec<f64>, PredictError> {
            Err(PredictError::prediction(&self.0.id, "backend exploded"))
        }

        fn metadata(&self) -> &ModelMetadata {
            &self.0
        }

        fn input_size(&self) -> usize {
            4
        }

        fn backend(&self) -> &'static str {
            "failing"
        }

        async fn close(&self) -> Result<(), PredictError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        seen: Mutex<Vec<(String, bool)>>,
    }

    impl PredictionObserver for RecordingObserver {
        fn observe(&self, model_id: &str, outcome: &Result<PredictionResponse, PredictError>) {
            self.seen.lock().push((model_id.to_string(), outcome.is_ok()));
        }
    }

    async fn stub_service() -> PredictionService {
        let registry = Arc::new(ModelRegistry::new());
        let stub = StubPredictor::new(
            ModelMetadata {
                id: "iris_v1".to_string(),
                name: "Iris Classifier".to_string(),
                version: "v1.0.0".to_string(),
                path: String::new(),
            },
            4,
        )
        .unwrap();
        registry.register("iris_v1", Arc::new(stub)).await.unwrap();
        PredictionService::new(registry)
    }

    async fn spy_service() -> (PredictionService, Arc<SpyPredictor>) {
        let registry = Arc::new(ModelRegistry::new());
        let spy = Arc::new(SpyPredictor::new("spy"));
        registry.register("spy", spy.clone()).await.unwrap();
        (PredictionService::new(registry), spy)
    }

    #[tokio::test]
    async fn test_validation_never_reaches_predictor() {
        let (service, spy) = spy_service().await;
        let cancel = CancellationToken::new();

        let err = service
            .predict(PredictionRequest::new("", vec![1.0, 2.0, 3.0, 4.0]), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, PredictError::Validation { ref field, .. } if field == "model_id"));

        let err = service
            .predict(PredictionRequest::new("spy", vec![]), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, PredictError::Validation { ref field, .. } if field == "features"));

        assert_eq!(spy.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_model() {
        let service = stub_service().await;
        let err = service
            .predict(
                PredictionRequest::new("unknown", vec![5.0, 3.0, 1.0, 0.2]),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        match err {
            PredictError::ModelNotFound(id) => assert_eq!(id, "unknown"),
            other => panic!("unexpected: {}", other),
        }
    }

    #[tokio::test]
    async fn test_wrong_arity_propagates_unchanged() {
        let service = stub_service().await;
        let err = service
            .predict(
                PredictionRequest::new("iris_v1", vec![1.0]),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        match err {
            PredictError::InvalidInput { expected, actual } => {
                assert_eq!(expected, 4);
                assert_eq!(actual, 1);
            }
            other => panic!("unexpected: {}", other),
        }
    }

    #[tokio::test]
    async fn test_backend_failure_propagates_unchanged() {
        let registry = Arc::new(ModelRegistry::new());
        let metadata = ModelMetadata {
            id: "broken".to_string(),
            name: "broken".to_string(),
            version: String::new(),
            path: String::new(),
        };
        registry
            .register("broken", Arc::new(FailingPredictor(metadata)))
            .await
            .unwrap();
        let service = PredictionService::new(registry);

        let err = service
            .predict(
                PredictionRequest::new("broken", vec![1.0, 2.0, 3.0, 4.0]),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PredictError::Prediction { ref model_id, .. } if model_id == "broken"));
    }

    #[tokio::test]
    async fn test_iris_classes() {
        let service = stub_service().await;
        let cancel = CancellationToken::new();

        for (features, expected) in [
            (vec![5.0, 3.0, 1.0, 0.2], 0.0),
            (vec![6.0, 3.0, 4.0, 1.0], 1.0),
            (vec![7.0, 3.0, 6.0, 2.0], 2.0),
        ] {
            let response = service
                .predict(PredictionRequest::new("iris_v1", features), &cancel)
                .await
                .unwrap();
            assert_eq!(response.model_id, "iris_v1");
            assert_eq!(response.prediction, vec![expected]);
            assert!(response.latency_ms >= 0.0);
            assert!(response.confidence.is_none());
        }
    }

    #[tokio::test]
    async fn test_same_input_same_class() {
        let service = stub_service().await;
        let cancel = CancellationToken::new();
        let request = PredictionRequest::new("iris_v1", vec![6.1, 2.8, 4.7, 1.2]);

        let first = service.predict(request.clone(), &cancel).await.unwrap();
        let second = service.predict(request, &cancel).await.unwrap();
        assert_eq!(first.prediction, second.prediction);
        assert_ne!(first.request_id, second.request_id);
    }

    #[tokio::test]
    async fn test_request_id_resolution() {
        let service = stub_service().await;
        let cancel = CancellationToken::new();
        let features = vec![5.0, 3.0, 1.0, 0.2];

        let response = service
            .predict(
                PredictionRequest::new("iris_v1", features.clone()).with_request_id("caller-1"),
                &cancel,
            )
            .await
            .unwrap();
        assert_eq!(response.request_id, "caller-1");

        let response = service
            .predict_with_request_id(
                PredictionRequest::new("iris_v1", features.clone()),
                Some("transport-1"),
                &cancel,
            )
            .await
            .unwrap();
        assert_eq!(response.request_id, "transport-1");

        let response = service
            .predict(
                PredictionRequest::new("iris_v1", features).with_request_id(""),
                &cancel,
            )
            .await
            .unwrap();
        assert!(uuid::Uuid::parse_str(&response.request_id).is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_before_call() {
        let (service, spy) = spy_service().await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = service
            .predict(PredictionRequest::new("spy", vec![1.0, 2.0, 3.0, 4.0]), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, PredictError::Cancelled));
        assert_eq!(spy.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_predictions_do_not_mix() {
        let service = Arc::new(stub_service().await);

        let mut handles = Vec::new();
        for i in 0..60 {
            let service = Arc::clone(&service);
            let (first, expected) = match i % 3 {
                0 => (5.0, 0.0),
                1 => (6.0, 1.0),
                _ => (7.0, 2.0),
            };
            handles.push(tokio::spawn(async move {
                let request_id = format!("req-{}", i);
                let response = service
                    .predict(
                        PredictionRequest::new("iris_v1", vec![first, 3.0, 4.0, 1.0])
                            .with_request_id(request_id.clone()),
                        &CancellationToken::new(),
                    )
                    .await
                    .unwrap();
                (request_id, response, expected)
            }));
        }

        for handle in handles {
            let (request_id, response, expected) = handle.await.unwrap();
            assert_eq!(response.request_id, request_id);
            assert_eq!(response.prediction, vec![expected]);
        }
    }

    #[tokio::test]
    async fn test_observer_sees_predictor_outcomes() {
        let observer = Arc::new(RecordingObserver::default());
        let service = stub_service().await.with_observer(observer.clone());
        let cancel = CancellationToken::new();

        service
            .predict(PredictionRequest::new("iris_v1", vec![5.0, 3.0, 1.0, 0.2]), &cancel)
            .await
            .unwrap();
        let _ = service
            .predict(PredictionRequest::new("iris_v1", vec![5.0]), &cancel)
            .await;
        // Rejected before a model is resolved: not observed
        let _ = service
            .predict(PredictionRequest::new("", vec![5.0]), &cancel)
            .await;

        let seen = observer.seen.lock().clone();
        assert_eq!(
            seen,
            vec![("iris_v1".to_string(), true), ("iris_v1".to_string(), false)]
        );
    }
}
