//! Error types for the detector core

use std::path::PathBuf;

/// Result type alias using the detector's error type
pub type Result<T> = std::result::Result<T, DetectorError>;

/// Errors raised by the model store, the feature extractor and the ensemble
#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    /// Persisted artifact is missing. Never cached, so a retry can succeed later.
    #[error("artifact '{key}' not found at {}", path.display())]
    ArtifactNotFound { key: String, path: PathBuf },

    #[error("failed to read artifact {}: {source}", path.display())]
    ArtifactRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed artifact {}: {source}", path.display())]
    ArtifactFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Artifact parsed but its contents are inconsistent
    #[error("invalid artifact: {0}")]
    InvalidArtifact(String),

    /// Feature extraction or classifier invocation failed for one input
    #[error("transform error in {model}: {message}")]
    Transform { model: String, message: String },

    /// No classifier in the ensemble could score this request
    #[error("no usable model out of {attempted}: {cause}")]
    NoUsableModel { attempted: usize, cause: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl DetectorError {
    pub fn transform(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transform {
            model: model.into(),
            message: message.into(),
        }
    }

    pub fn invalid_artifact(msg: impl Into<String>) -> Self {
        Self::InvalidArtifact(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether a later attempt at the same operation may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ArtifactNotFound { .. })
    }
}
