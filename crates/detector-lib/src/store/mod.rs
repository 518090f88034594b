//! Model store: load-once cache for the feature extractor and classifiers
//!
//! The store is an explicit object owned by the application's composition
//! root and shared by handle. Each key is loaded lazily on first access,
//! at most once, and then kept for the life of the store. A failed load is
//! never cached, so a retry after the artifact appears succeeds.

mod artifact;

pub use artifact::{compute_checksum, FsArtifactLoader, CLASSIFIER_EXTENSION, VECTORIZER_FILE};

use crate::classifier::Classifier;
use crate::error::Result;
use crate::features::{FeatureExtractor, VECTORIZER_KEY};
use dashmap::DashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Classifier identifiers served by default, in ensemble order
pub const DEFAULT_CLASSIFIERS: [&str; 3] = ["LogisticRegression", "MultinomialNB", "SGDClassifier"];

/// Source of persisted artifacts
pub trait ArtifactLoader: Send + Sync {
    /// Deserialize the feature extractor
    fn load_feature_extractor(&self) -> Result<Arc<dyn FeatureExtractor>>;

    /// Deserialize the classifier stored under `name`
    fn load_classifier(&self, name: &str) -> Result<Classifier>;
}

/// Logical cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArtifactKey {
    Vectorizer,
    Classifier(String),
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKey::Vectorizer => f.write_str(VECTORIZER_KEY),
            ArtifactKey::Classifier(name) => f.write_str(name),
        }
    }
}

#[derive(Clone)]
enum CachedArtifact {
    Extractor(Arc<dyn FeatureExtractor>),
    Classifier(Arc<Classifier>),
}

/// Outcome of an eager load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub loaded: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl LoadSummary {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Process-wide, read-mostly cache of loaded artifacts
pub struct ModelStore {
    loader: Arc<dyn ArtifactLoader>,
    classifier_names: Vec<String>,
    entries: DashMap<ArtifactKey, CachedArtifact>,
    load_locks: DashMap<ArtifactKey, Arc<Mutex<()>>>,
}

impl ModelStore {
    pub fn new(loader: Arc<dyn ArtifactLoader>, classifier_names: Vec<String>) -> Self {
        Self {
            loader,
            classifier_names,
            entries: DashMap::new(),
            load_locks: DashMap::new(),
        }
    }

    /// Store over the three default classifiers
    pub fn with_default_classifiers(loader: Arc<dyn ArtifactLoader>) -> Self {
        Self::new(
            loader,
            DEFAULT_CLASSIFIERS.iter().map(|s| s.to_string()).collect(),
        )
    }

    /// Configured classifier identifiers, in ensemble order
    pub fn classifier_names(&self) -> &[String] {
        &self.classifier_names
    }

    /// Cached feature extractor, loading it on first call
    pub fn feature_extractor(&self) -> Result<Arc<dyn FeatureExtractor>> {
        match self.get_or_load(ArtifactKey::Vectorizer)? {
            CachedArtifact::Extractor(extractor) => Ok(extractor),
            CachedArtifact::Classifier(_) => unreachable!("vectorizer key holds a classifier"),
        }
    }

    /// Cached classifier, loading it on first call
    pub fn classifier(&self, name: &str) -> Result<Arc<Classifier>> {
        match self.get_or_load(ArtifactKey::Classifier(name.to_string()))? {
            CachedArtifact::Classifier(classifier) => Ok(classifier),
            CachedArtifact::Extractor(_) => unreachable!("classifier key holds a vectorizer"),
        }
    }

    /// Label set of a classifier, in the model's own order
    pub fn classifier_labels(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.classifier(name)?.labels().to_vec())
    }

    /// Eagerly load the feature extractor and every configured classifier.
    ///
    /// Only a missing feature extractor is an error; classifier failures are
    /// logged and reported in the summary.
    pub fn load_all(&self) -> Result<LoadSummary> {
        self.feature_extractor()?;

        let mut summary = LoadSummary::default();
        for name in &self.classifier_names {
            match self.classifier(name) {
                Ok(_) => summary.loaded.push(name.clone()),
                Err(e) => {
                    warn!(model = %name, error = %e, "Classifier not loaded, continuing without it");
                    summary.failed.push((name.clone(), e.to_string()));
                }
            }
        }

        info!(
            loaded = ?summary.loaded,
            failed = summary.failed.len(),
            "Model store populated"
        );
        Ok(summary)
    }

    /// True when the feature extractor and at least one classifier are cached
    pub fn is_ready(&self) -> bool {
        self.is_extractor_loaded()
            && self
                .entries
                .iter()
                .any(|entry| matches!(entry.key(), ArtifactKey::Classifier(_)))
    }

    pub fn is_extractor_loaded(&self) -> bool {
        self.entries.contains_key(&ArtifactKey::Vectorizer)
    }

    pub fn is_classifier_loaded(&self, name: &str) -> bool {
        self.entries
            .contains_key(&ArtifactKey::Classifier(name.to_string()))
    }

    /// Configured classifiers currently cached, in ensemble order
    pub fn loaded_classifiers(&self) -> Vec<String> {
        self.classifier_names
            .iter()
            .filter(|name| self.is_classifier_loaded(name))
            .cloned()
            .collect()
    }

    /// Number of cached artifacts, vectorizer included
    pub fn loaded_count(&self) -> usize {
        self.entries.len()
    }

    /// Drop every cached artifact
    pub fn reset(&self) {
        self.entries.clear();
        self.load_locks.clear();
        debug!("Model store cleared");
    }

    fn cached(&self, key: &ArtifactKey) -> Option<CachedArtifact> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn get_or_load(&self, key: ArtifactKey) -> Result<CachedArtifact> {
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }

        // One loader per key; concurrent first callers wait and then hit the cache
        let lock = self.load_locks.entry(key.clone()).or_default().value().clone();
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }

        let loaded = match &key {
            ArtifactKey::Vectorizer => CachedArtifact::Extractor(self.loader.load_feature_extractor()?),
            ArtifactKey::Classifier(name) => {
                CachedArtifact::Classifier(Arc::new(self.loader.load_classifier(name)?))
            }
        };

        debug!(key = %key, "Artifact cached");
        self.entries.insert(key, loaded.clone());
        Ok(loaded)
    }
}

impl fmt::Debug for ModelStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelStore")
            .field("classifier_names", &self.classifier_names)
            .field("extractor_loaded", &self.is_extractor_loaded())
            .field("loaded_classifiers", &self.loaded_classifiers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DetectorError;
    use crate::testing::{ai_human, failing_factory, proba_factory, StubLoader};
    use std::thread;

    fn store_with(loader: Arc<StubLoader>) -> ModelStore {
        ModelStore::with_default_classifiers(loader)
    }

    #[test]
    fn test_empty_at_start() {
        let store = store_with(Arc::new(StubLoader::new()));
        assert!(!store.is_ready());
        assert_eq!(store.loaded_count(), 0);
        assert!(store.loaded_classifiers().is_empty());
    }

    #[test]
    fn test_repeated_access_returns_same_instance() {
        let loader = Arc::new(
            StubLoader::new().with_classifier("LogisticRegression", proba_factory(ai_human(), vec![0.7, 0.3])),
        );
        let store = store_with(loader.clone());

        let first = store.classifier("LogisticRegression").unwrap();
        let second = store.classifier("LogisticRegression").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.load_count("LogisticRegression"), 1);

        let e1 = store.feature_extractor().unwrap();
        let e2 = store.feature_extractor().unwrap();
        assert!(Arc::ptr_eq(&e1, &e2));
        assert_eq!(loader.load_count(VECTORIZER_KEY), 1);
    }

    #[test]
    fn test_missing_artifact_not_cached_and_retryable() {
        let loader = Arc::new(StubLoader::new());
        let store = store_with(loader.clone());

        let err = store.classifier("SGDClassifier").unwrap_err();
        assert!(err.is_retryable());
        assert!(!store.is_classifier_loaded("SGDClassifier"));

        loader.add_classifier("SGDClassifier", proba_factory(ai_human(), vec![0.2, 0.8]));
        assert!(store.classifier("SGDClassifier").is_ok());
        assert_eq!(loader.load_count("SGDClassifier"), 2);
    }

    #[test]
    fn test_load_all_tolerates_missing_classifiers() {
        let loader = Arc::new(
            StubLoader::new()
                .with_classifier("LogisticRegression", proba_factory(ai_human(), vec![0.7, 0.3]))
                .with_classifier("SGDClassifier", failing_factory()),
        );
        let store = store_with(loader);

        let summary = store.load_all().unwrap();
        assert_eq!(summary.loaded, vec!["LogisticRegression", "SGDClassifier"]);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "MultinomialNB");
        assert!(!summary.is_complete());
        assert!(store.is_ready());
        assert_eq!(
            store.loaded_classifiers(),
            vec!["LogisticRegression", "SGDClassifier"]
        );
    }

    #[test]
    fn test_load_all_fails_without_extractor() {
        let loader = Arc::new(
            StubLoader::new().with_classifier("LogisticRegression", proba_factory(ai_human(), vec![0.7, 0.3])),
        );
        loader.set_extractor_missing(true);
        let store = store_with(loader.clone());

        assert!(matches!(
            store.load_all(),
            Err(DetectorError::ArtifactNotFound { .. })
        ));
        assert!(!store.is_ready());

        loader.set_extractor_missing(false);
        store.load_all().unwrap();
        assert!(store.is_ready());
    }

    #[test]
    fn test_not_ready_without_classifier() {
        let store = store_with(Arc::new(StubLoader::new()));
        store.load_all().unwrap();
        assert!(store.is_extractor_loaded());
        assert!(!store.is_ready());
    }

    #[test]
    fn test_reset_drops_everything() {
        let loader = Arc::new(
            StubLoader::new().with_classifier("LogisticRegression", proba_factory(ai_human(), vec![0.7, 0.3])),
        );
        let store = store_with(loader.clone());
        store.load_all().unwrap();
        assert!(store.is_ready());

        store.reset();
        assert!(!store.is_ready());
        assert_eq!(store.loaded_count(), 0);

        store.classifier("LogisticRegression").unwrap();
        assert_eq!(loader.load_count("LogisticRegression"), 2);
    }

    #[test]
    fn test_concurrent_first_access_loads_once() {
        let loader = Arc::new(
            StubLoader::new().with_classifier("MultinomialNB", proba_factory(ai_human(), vec![0.4, 0.6])),
        );
        let store = Arc::new(store_with(loader.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || store.classifier("MultinomialNB").unwrap())
            })
            .collect();
        let instances: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(loader.load_count("MultinomialNB"), 1);
        assert!(instances.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_classifier_labels() {
        let loader = Arc::new(StubLoader::new().with_classifier(
            "SGDClassifier",
            proba_factory(vec!["human".to_string(), "ai".to_string()], vec![0.5, 0.5]),
        ));
        let store = store_with(loader);
        assert_eq!(
            store.classifier_labels("SGDClassifier").unwrap(),
            vec!["human", "ai"]
        );
    }
}
