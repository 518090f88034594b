//! Observability infrastructure for the text detector
//!
//! Provides:
//! - Prometheus metrics (prediction latency, verdicts, per-model failures, loaded artifacts)
//! - Structured JSON logging with tracing

use crate::models::{EnsembleResult, Verdict};
use crate::store::LoadSummary;
use prometheus::{
    register_histogram, register_int_counter_vec, register_int_gauge, Histogram, IntCounterVec,
    IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<DetectorMetricsInner> = OnceLock::new();

struct DetectorMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounterVec,
    model_failures_total: IntCounterVec,
    artifacts_loaded: IntGauge,
    rejected_inputs_total: IntCounterVec,
}

impl DetectorMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "text_detector_prediction_latency_seconds",
                "Time spent running the ensemble for one text",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter_vec!(
                "text_detector_predictions_total",
                "Ensemble verdicts returned, by verdict",
                &["verdict"]
            )
            .expect("Failed to register predictions_total"),

            model_failures_total: register_int_counter_vec!(
                "text_detector_model_failures_total",
                "Classifiers excluded from an ensemble run after failing",
                &["model"]
            )
            .expect("Failed to register model_failures_total"),

            artifacts_loaded: register_int_gauge!(
                "text_detector_artifacts_loaded",
                "Artifacts currently held by the model store"
            )
            .expect("Failed to register artifacts_loaded"),

            rejected_inputs_total: register_int_counter_vec!(
                "text_detector_rejected_inputs_total",
                "Requests rejected before reaching the ensemble, by reason",
                &["reason"]
            )
            .expect("Failed to register rejected_inputs_total"),
        }
    }
}

/// Detector metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share it.
#[derive(Clone)]
pub struct DetectorMetrics {
    _private: (),
}

impl Default for DetectorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(DetectorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &DetectorMetricsInner {
        GLOBAL_METRICS.get_or_init(DetectorMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self, verdict: Verdict) {
        self.inner()
            .predictions_total
            .with_label_values(&[verdict.as_str()])
            .inc();
    }

    pub fn inc_model_failure(&self, model: &str) {
        self.inner()
            .model_failures_total
            .with_label_values(&[model])
            .inc();
    }

    pub fn set_artifacts_loaded(&self, count: usize) {
        self.inner().artifacts_loaded.set(count as i64);
    }

    /// Count an input rejected at the boundary (`empty`, `too_short`, `malformed`)
    pub fn inc_rejected(&self, reason: &str) {
        self.inner()
            .rejected_inputs_total
            .with_label_values(&[reason])
            .inc();
    }
}

/// Structured logger for detector events
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str, models_dir: &str, temperature: f64) {
        info!(
            event = "detector_started",
            instance = %self.instance,
            version = %version,
            models_dir = %models_dir,
            temperature = temperature,
            "Text detector started"
        );
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "detector_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Text detector shutting down"
        );
    }

    /// Log an incoming text before it is scored
    pub fn log_request(&self, text: &str) {
        let preview: String = text.chars().take(120).collect();
        info!(
            event = "prediction_requested",
            instance = %self.instance,
            input_length = text.chars().count(),
            preview = %preview,
            "Scoring text"
        );
    }

    /// Log the ensemble verdict for one text
    pub fn log_verdict(&self, result: &EnsembleResult, elapsed_secs: f64) {
        let models: Vec<&str> = result.models.iter().map(|m| m.model_name.as_str()).collect();
        info!(
            event = "prediction_completed",
            instance = %self.instance,
            verdict = %result.overall.prediction,
            ai_probability = result.overall.ai_probability,
            human_probability = result.overall.human_probability,
            models = ?models,
            elapsed_secs = elapsed_secs,
            "Ensemble verdict"
        );
    }

    /// Log the outcome of an eager store load
    pub fn log_load_summary(&self, summary: &LoadSummary) {
        if summary.is_complete() {
            info!(
                event = "models_loaded",
                instance = %self.instance,
                loaded = ?summary.loaded,
                "All artifacts loaded"
            );
        } else {
            let failed: Vec<&str> = summary.failed.iter().map(|(name, _)| name.as_str()).collect();
            warn!(
                event = "models_loaded",
                instance = %self.instance,
                loaded = ?summary.loaded,
                failed = ?failed,
                "Some classifiers unavailable, serving with the rest"
            );
        }
    }

    /// Log an input rejected before reaching the ensemble
    pub fn log_rejected_input(&self, reason: &str, input_length: usize) {
        warn!(
            event = "input_rejected",
            instance = %self.instance,
            reason = %reason,
            input_length = input_length,
            "Rejected input"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Encoder;

    #[test]
    fn test_detector_metrics_exposed() {
        let metrics = DetectorMetrics::new();
        metrics.observe_prediction_latency(0.002);
        metrics.inc_predictions(Verdict::Ai);
        metrics.inc_model_failure("SGDClassifier");
        metrics.set_artifacts_loaded(4);
        metrics.inc_rejected("too_short");

        let mut buffer = Vec::new();
        prometheus::TextEncoder::new()
            .encode(&prometheus::gather(), &mut buffer)
            .unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("text_detector_predictions_total"));
        assert!(text.contains("text_detector_model_failures_total{model=\"SGDClassifier\"}"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("test-instance");
        assert_eq!(logger.instance(), "test-instance");
    }
}
