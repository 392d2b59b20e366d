//! Request and prediction metrics
//!
//! Counters are atomics so the hot path never takes a lock beyond the first
//! time a model id is seen. Rendered in the Prometheus text format.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use parking_lot::RwLock;

use crate::domain::{PredictError, PredictionResponse};
use crate::engine::PredictionObserver;

/// Per-model prediction counters
#[derive(Default)]
struct ModelCounters {
    succeeded: AtomicU64,
    failed: AtomicU64,
    /// Sum of successful inference latencies, in microseconds
    latency_us: AtomicU64,
}

/// Process-wide metrics collector
#[derive(Default)]
pub struct Metrics {
    http_requests: AtomicU64,
    http_2xx: AtomicU64,
    http_4xx: AtomicU64,
    http_5xx: AtomicU64,
    http_duration_us: AtomicU64,
    models: RwLock<BTreeMap<String, Arc<ModelCounters>>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one finished HTTP request
    pub fn record_http(&self, status: u16, duration: Duration) {
        self.http_requests.fetch_add(1, Ordering::Relaxed);
        self.http_duration_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        let bucket = match status {
            200..=299 => &self.http_2xx,
            400..=499 => &self.http_4xx,
            500..=599 => &self.http_5xx,
            _ => return,
        };
        bucket.fetch_add(1, Ordering::Relaxed);
    }

    fn model(&self, model_id: &str) -> Arc<ModelCounters> {
        if let Some(counters) = self.models.read().get(model_id) {
            return Arc::clone(counters);
        }
        let mut models = self.models.write();
        Arc::clone(models.entry(model_id.to_string()).or_default())
    }

    /// Total HTTP requests recorded
    pub fn http_requests(&self) -> u64 {
        self.http_requests.load(Ordering::Relaxed)
    }

    /// (succeeded, failed) predictions for a model
    pub fn predictions(&self, model_id: &str) -> (u64, u64) {
        self.models
            .read()
            .get(model_id)
            .map(|c| {
                (
                    c.succeeded.load(Ordering::Relaxed),
                    c.failed.load(Ordering::Relaxed),
                )
            })
            .unwrap_or((0, 0))
    }

    /// Render all metrics in Prometheus text exposition format
    pub fn to_prometheus_format(&self) -> String {
        let mut out = String::new();

        out.push_str("# HELP irisd_http_requests_total Total HTTP requests handled\n");
        out.push_str("# TYPE irisd_http_requests_total counter\n");
        let _ = writeln!(out, "irisd_http_requests_total {}", self.http_requests());

        out.push_str("# HELP irisd_http_responses_total HTTP responses by status class\n");
        out.push_str("# TYPE irisd_http_responses_total counter\n");
        for (class, counter) in [
            ("2xx", &self.http_2xx),
            ("4xx", &self.http_4xx),
            ("5xx", &self.http_5xx),
        ] {
            let _ = writeln!(
                out,
                "irisd_http_responses_total{{class=\"{}\"}} {}",
                class,
                counter.load(Ordering::Relaxed)
            );
        }

        out.push_str("# HELP irisd_http_request_duration_seconds_sum Total time spent handling HTTP requests\n");
        out.push_str("# TYPE irisd_http_request_duration_seconds_sum counter\n");
        let _ = writeln!(
            out,
            "irisd_http_request_duration_seconds_sum {:.6}",
            self.http_duration_us.load(Ordering::Relaxed) as f64 / 1e6
        );

        let models = self.models.read();

        out.push_str("# HELP irisd_predictions_total Predictions by model and outcome\n");
        out.push_str("# TYPE irisd_predictions_total counter\n");
        for (id, c) in models.iter() {
            let _ = writeln!(
                out,
                "irisd_predictions_total{{model_id=\"{}\",outcome=\"success\"}} {}",
                id,
                c.succeeded.load(Ordering::Relaxed)
            );
            let _ = writeln!(
                out,
                "irisd_predictions_total{{model_id=\"{}\",outcome=\"error\"}} {}",
                id,
                c.failed.load(Ordering::Relaxed)
            );
        }

        out.push_str("# HELP irisd_prediction_latency_seconds_sum Total inference time by model\n");
        out.push_str("# TYPE irisd_prediction_latency_seconds_sum counter\n");
        for (id, c) in models.iter() {
            let _ = writeln!(
                out,
                "irisd_prediction_latency_seconds_sum{{model_id=\"{}\"}} {:.6}",
                id,
                c.latency_us.load(Ordering::Relaxed) as f64 / 1e6
            );
        }

        out
    }
}

impl PredictionObserver for Metrics {
    fn observe(&self, model_id: &str, outcome: &Result<PredictionResponse, PredictError>) {
        let counters = self.model(model_id);
        match outcome {
            Ok(response) => {
                counters.succeeded.fetch_add(1, Ordering::Relaxed);
                counters
                    .latency_us
                    .fetch_add((response.latency_ms * 1000.0) as u64, Ordering::Relaxed);
            }
            Err(_) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Middleware recording status class and duration of every request except
/// scrapes of `/metrics` itself
pub async fn track_http(State(metrics): State<Arc<Metrics>>, req: Request, next: Next) -> Response {
    if req.uri().path() == "/metrics" {
        return next.run(req).await;
    }

    let start = std::time::Instant::now();
    let response = next.run(req).await;
    metrics.record_http(response.status().as_u16(), start.elapsed());
    response
}
