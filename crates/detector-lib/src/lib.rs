//! Detector library for AI-versus-human text classification
//!
//! This crate provides the core functionality for:
//! - Loading and caching pre-fitted artifacts (TF-IDF vectorizer, classifiers)
//! - Turning any classifier's output into a label distribution
//! - Temperature calibration and ensemble aggregation
//! - Health checks and observability

pub mod classifier;
pub mod error;
pub mod features;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod store;

#[cfg(test)]
mod testing;

pub use classifier::{CapabilityTier, Classifier};
pub use error::{DetectorError, Result};
pub use health::{ComponentHealth, ComponentStatus, HealthResponse, ReadinessResponse};
pub use models::*;
pub use observability::{DetectorMetrics, StructuredLogger};
pub use predictor::{EnsembleConfig, EnsemblePredictor, Temperature};
pub use store::{ArtifactLoader, FsArtifactLoader, LoadSummary, ModelStore};
