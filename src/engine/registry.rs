//! Model registry
//!
//! Maps model ids to loaded predictors. Populated once at startup and read on
//! every request afterwards.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::{ModelMetadata, PredictError, RegistryError};
use crate::predictor::SharedPredictor;

/// Concurrency-safe store of loaded models
///
/// Lookups and listings share a read lock; registration takes the write
/// lock. Entries are never replaced or removed while serving.
#[derive(Default)]
pub struct ModelRegistry {
    /// Ordered so that listings are stable
    models: RwLock<BTreeMap<String, SharedPredictor>>,
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry").finish_non_exhaustive()
    }
}

impl ModelRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a predictor under `id`. Rejects an id that is already taken.
    pub async fn register(
        &self,
        id: impl Into<String>,
        predictor: SharedPredictor,
    ) -> Result<(), RegistryError> {
        let id = id.into();
        let mut models = self.models.write().await;
        if models.contains_key(&id) {
            return Err(RegistryError::Duplicate(id));
        }
        tracing::info!(model_id = %id, backend = predictor.backend(), "Registered model");
        models.insert(id, predictor);
        Ok(())
    }

    /// Get the predictor registered under `id`
    pub async fn get(&self, id: &str) -> Result<SharedPredictor, PredictError> {
        let models = self.models.read().await;
        models
            .get(id)
            .map(Arc::clone)
            .ok_or_else(|| PredictError::ModelNotFound(id.to_string()))
    }

    /// Registered model ids, sorted
    pub async fn list(&self) -> Vec<String> {
        let models = self.models.read().await;
        models.keys().cloned().collect()
    }

    /// Metadata of every registered model, in `list` order
    pub async fn metadata(&self) -> Vec<ModelMetadata> {
        let models = self.models.read().await;
        models.values().map(|p| p.metadata().clone()).collect()
    }

    /// Number of registered models
    pub async fn len(&self) -> usize {
        self.models.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.models.read().await.is_empty()
    }

    /// Release every predictor. Failures are logged, not returned.
    pub async fn close_all(&self) {
        let predictors: Vec<(String, SharedPredictor)> = {
            let models = self.models.read().await;
            models
                .iter()
                .map(|(id, p)| (id.clone(), Arc::clone(p)))
                .collect()
        };

        for (id, predictor) in predictors {
            match predictor.close().await {
                Ok(()) => tracing::info!(model_id = %id, "Closed model"),
                Err(e) => tracing::warn!(model_id = %id, error = %e, "Failed to close model"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::StubPredictor;

    fn stub(id: &str) -> SharedPredictor {
        Arc::new(
            StubPredictor::new(
                ModelMetadata {
                    id: id.to_string(),
                    name: format!("{} model", id),
                    version: "v1".to_string(),
                    path: String::new(),
                },
                4,
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_register_and_get() {
        let registry = ModelRegistry::new();
        registry.register("iris_v1", stub("iris_v1")).await.unwrap();

        let predictor = registry.get("iris_v1").await.unwrap();
        assert_eq!(predictor.metadata().id, "iris_v1");
        assert_eq!(registry.len().await, 1);
        assert!(!registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let registry = ModelRegistry::new();
        match registry.get("unknown").await {
            Err(PredictError::ModelNotFound(id)) => assert_eq!(id, "unknown"),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("expected ModelNotFound"),
        }
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let registry = ModelRegistry::new();
        registry.register("iris_v1", stub("iris_v1")).await.unwrap();

        let err = registry
            .register("iris_v1", stub("other"))
            .await
            .unwrap_err();
        assert_eq!(err, RegistryError::Duplicate("iris_v1".to_string()));

        // The original entry survives
        let predictor = registry.get("iris_v1").await.unwrap();
        assert_eq!(predictor.metadata().id, "iris_v1");
    }

    #[tokio::test]
    async fn test_list_is_sorted_and_stable() {
        let registry = ModelRegistry::new();
        for id in ["zeta", "alpha", "mid"] {
            registry.register(id, stub(id)).await.unwrap();
        }

        let first = registry.list().await;
        assert_eq!(first, vec!["alpha", "mid", "zeta"]);
        assert_eq!(registry.list().await, first);

        let ids: Vec<String> = registry.metadata().await.into_iter().map(|m| m.id).collect();
        assert_eq!(ids, first);
    }

    #[tokio::test]
    async fn test_concurrent_reads() {
        let registry = Arc::new(ModelRegistry::new());
        registry.register("iris_v1", stub("iris_v1")).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..32 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry.get("iris_v1").await.is_ok() && registry.list().await.len() == 1
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_close_all() {
        let registry = ModelRegistry::new();
        registry.register("a", stub("a")).await.unwrap();
        registry.register("b", stub("b")).await.unwrap();
        registry.close_all().await;
        // Entries remain listed; closing only releases backend resources
        assert_eq!(registry.len().await, 2);
    }
}
