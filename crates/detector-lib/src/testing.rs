//! Stub models and an instrumented loader shared by unit tests

use crate::classifier::{Capability, Classifier, LabelModel, MarginModel, ProbabilisticModel};
use crate::error::{DetectorError, Result};
use crate::features::{FeatureExtractor, VECTORIZER_KEY};
use crate::models::{FeatureVector, AI_LABEL, HUMAN_LABEL};
use crate::store::ArtifactLoader;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

pub(crate) fn labels(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

pub(crate) fn ai_human() -> Vec<String> {
    labels(&[AI_LABEL, HUMAN_LABEL])
}

pub(crate) struct FixedProba(pub Vec<f64>);

impl ProbabilisticModel for FixedProba {
    fn predict_proba(&self, _features: &FeatureVector) -> Result<Vec<f64>> {
        Ok(self.0.clone())
    }
}

pub(crate) struct FixedMargin(pub f64);

impl MarginModel for FixedMargin {
    fn decision_function(&self, _features: &FeatureVector) -> Result<f64> {
        Ok(self.0)
    }
}

pub(crate) struct FixedLabel(pub &'static str);

impl LabelModel for FixedLabel {
    fn predict(&self, _features: &FeatureVector) -> Result<String> {
        Ok(self.0.to_string())
    }
}

pub(crate) struct FailingModel;

impl ProbabilisticModel for FailingModel {
    fn predict_proba(&self, _features: &FeatureVector) -> Result<Vec<f64>> {
        Err(DetectorError::transform("stub", "model exploded"))
    }
}

/// One-column extractor; fails on text containing `FAIL_EXTRACT`
pub(crate) struct StubExtractor;

impl FeatureExtractor for StubExtractor {
    fn transform(&self, text: &str) -> Result<FeatureVector> {
        if text.contains("FAIL_EXTRACT") {
            return Err(DetectorError::transform(VECTORIZER_KEY, "cannot vectorize"));
        }
        Ok(FeatureVector::from_dense(&[text.len() as f64]))
    }

    fn dimension(&self) -> usize {
        1
    }
}

type Factory = Box<dyn Fn(&str) -> Result<Classifier> + Send + Sync>;

pub(crate) fn proba_factory(labels: Vec<String>, probs: Vec<f64>) -> Factory {
    Box::new(move |name| {
        Classifier::new(
            name,
            labels.clone(),
            Capability::Probabilistic(Box::new(FixedProba(probs.clone()))),
        )
    })
}

pub(crate) fn margin_factory(labels: Vec<String>, decision: f64) -> Factory {
    Box::new(move |name| {
        Classifier::new(
            name,
            labels.clone(),
            Capability::MarginBased(Box::new(FixedMargin(decision))),
        )
    })
}

pub(crate) fn label_factory(labels: Vec<String>, label: &'static str) -> Factory {
    Box::new(move |name| {
        Classifier::new(
            name,
            labels.clone(),
            Capability::LabelOnly(Box::new(FixedLabel(label))),
        )
    })
}

pub(crate) fn failing_factory() -> Factory {
    Box::new(|name| {
        Classifier::new(
            name,
            ai_human(),
            Capability::Probabilistic(Box::new(FailingModel)),
        )
    })
}

/// Loader that builds stub artifacts and counts every load attempt per key
#[derive(Default)]
pub(crate) struct StubLoader {
    extractor_missing: AtomicBool,
    factories: RwLock<HashMap<String, Factory>>,
    loads: Mutex<HashMap<String, usize>>,
}

impl StubLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_classifier(self, name: &str, factory: Factory) -> Self {
        self.add_classifier(name, factory);
        self
    }

    pub fn add_classifier(&self, name: &str, factory: Factory) {
        self.factories
            .write()
            .unwrap()
            .insert(name.to_string(), factory);
    }

    pub fn set_extractor_missing(&self, missing: bool) {
        self.extractor_missing.store(missing, Ordering::SeqCst);
    }

    pub fn load_count(&self, key: &str) -> usize {
        self.loads.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    fn record(&self, key: &str) {
        *self.loads.lock().unwrap().entry(key.to_string()).or_default() += 1;
    }

    fn missing(key: &str) -> DetectorError {
        DetectorError::ArtifactNotFound {
            key: key.to_string(),
            path: PathBuf::from(format!("stub/{}.json", key)),
        }
    }
}

impl ArtifactLoader for StubLoader {
    fn load_feature_extractor(&self) -> Result<Arc<dyn FeatureExtractor>> {
        self.record(VECTORIZER_KEY);
        if self.extractor_missing.load(Ordering::SeqCst) {
            return Err(Self::missing(VECTORIZER_KEY));
        }
        Ok(Arc::new(StubExtractor))
    }

    fn load_classifier(&self, name: &str) -> Result<Classifier> {
        self.record(name);
        match self.factories.read().unwrap().get(name) {
            Some(factory) => factory(name),
            None => Err(Self::missing(name)),
        }
    }
}
