//! Filesystem artifact loading
//!
//! Artifacts are JSON documents in a single models directory:
//! `tfidf_vectorizer.json` for the feature extractor and `<name>.json` for
//! each classifier. Every successful load is logged with the artifact's size
//! and SHA-256 checksum so a running process can be matched to the files the
//! training run produced.

use super::ArtifactLoader;
use crate::classifier::{Classifier, ClassifierSpec};
use crate::error::{DetectorError, Result};
use crate::features::{ExtractorSpec, FeatureExtractor, VECTORIZER_KEY};
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// File name of the persisted feature extractor
pub const VECTORIZER_FILE: &str = "tfidf_vectorizer.json";

/// Extension of persisted classifier artifacts
pub const CLASSIFIER_EXTENSION: &str = "json";

/// Loads artifacts from a models directory
#[derive(Debug, Clone)]
pub struct FsArtifactLoader {
    model_dir: PathBuf,
}

/// Raw artifact read from disk, before it is built into a runnable model
struct RawArtifact<T> {
    spec: T,
    size_bytes: usize,
    checksum: String,
}

impl FsArtifactLoader {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
        }
    }

    pub fn vectorizer_path(&self) -> PathBuf {
        self.model_dir.join(VECTORIZER_FILE)
    }

    pub fn classifier_path(&self, name: &str) -> PathBuf {
        self.model_dir.join(format!("{}.{}", name, CLASSIFIER_EXTENSION))
    }

    fn read_artifact<T: DeserializeOwned>(&self, key: &str, path: &Path) -> Result<RawArtifact<T>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(DetectorError::ArtifactNotFound {
                    key: key.to_string(),
                    path: path.to_path_buf(),
                })
            }
            Err(source) => {
                return Err(DetectorError::ArtifactRead {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let spec = serde_json::from_slice(&bytes).map_err(|source| DetectorError::ArtifactFormat {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(RawArtifact {
            spec,
            size_bytes: bytes.len(),
            checksum: compute_checksum(&bytes),
        })
    }
}

impl ArtifactLoader for FsArtifactLoader {
    fn load_feature_extractor(&self) -> Result<Arc<dyn FeatureExtractor>> {
        let path = self.vectorizer_path();
        let raw: RawArtifact<ExtractorSpec> = self.read_artifact(VECTORIZER_KEY, &path)?;
        let extractor = raw.spec.build()?;

        info!(
            key = VECTORIZER_KEY,
            path = %path.display(),
            size_bytes = raw.size_bytes,
            checksum = %raw.checksum,
            dimension = extractor.dimension(),
            "Vectorizer loaded"
        );
        Ok(extractor)
    }

    fn load_classifier(&self, name: &str) -> Result<Classifier> {
        if name.is_empty() || name.contains(|c: char| c == '/' || c == '\\') || name.contains("..") {
            return Err(DetectorError::invalid_input(format!(
                "invalid classifier name '{}'",
                name
            )));
        }

        let path = self.classifier_path(name);
        let raw: RawArtifact<ClassifierSpec> = self.read_artifact(name, &path)?;
        let classifier = raw.spec.build(name)?;

        info!(
            key = %name,
            path = %path.display(),
            size_bytes = raw.size_bytes,
            checksum = %raw.checksum,
            capability = %classifier.capability_tier(),
            labels = ?classifier.labels(),
            "Model loaded"
        );
        Ok(classifier)
    }
}

/// Hex-encoded SHA-256 of an artifact's bytes
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
