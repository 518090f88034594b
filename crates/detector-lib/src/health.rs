//! Health check infrastructure for the text detector
//!
//! Component health is derived from the model store on demand: the
//! vectorizer and each configured classifier are one component each.

use crate::features::VECTORIZER_KEY;
use crate::store::ModelStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// State of one artifact slot, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Artifact is cached and serving
    Healthy,
    /// Artifact is missing but the ensemble still answers without it
    Degraded,
    /// Nothing can be scored
    Unhealthy,
}

impl ComponentStatus {
    /// Whether predictions can still be served in this state
    pub fn is_operational(&self) -> bool {
        *self != ComponentStatus::Unhealthy
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    /// A cached artifact is healthy; a missing one takes `when_missing`
    fn artifact(loaded: bool, when_missing: ComponentStatus, missing_message: &str) -> Self {
        let (status, message) = if loaded {
            (ComponentStatus::Healthy, None)
        } else {
            (when_missing, Some(missing_message.to_string()))
        };
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Per-artifact view of the model store, keyed by artifact name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Never triggers a load. A missing vectorizer is unhealthy, a missing
    /// classifier degraded, and a store with no classifier at all unhealthy.
    pub fn from_store(store: &ModelStore) -> Self {
        let mut components = HashMap::new();
        components.insert(
            VECTORIZER_KEY.to_string(),
            ComponentHealth::artifact(
                store.is_extractor_loaded(),
                ComponentStatus::Unhealthy,
                "vectorizer not loaded",
            ),
        );
        for name in store.classifier_names() {
            components.insert(
                name.clone(),
                ComponentHealth::artifact(
                    store.is_classifier_loaded(name),
                    ComponentStatus::Degraded,
                    "classifier not loaded",
                ),
            );
        }

        let status = if store.loaded_classifiers().is_empty() {
            ComponentStatus::Unhealthy
        } else {
            Self::worst_status(&components)
        };
        Self { status, components }
    }

    /// Worst status among the artifacts; healthy when there are none
    pub fn worst_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        components
            .values()
            .map(|health| health.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy)
    }
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ReadinessResponse {
    pub fn from_store(store: &ModelStore) -> Self {
        if !store.is_extractor_loaded() {
            ReadinessResponse {
                ready: false,
                reason: Some("Vectorizer not loaded".to_string()),
            }
        } else if !store.is_ready() {
            ReadinessResponse {
                ready: false,
                reason: Some("No classifier loaded".to_string()),
            }
        } else {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        }
    }
}
