//! Feature extraction from raw text
//!
//! A feature extractor is fitted offline and loaded once; at inference time it
//! only maps text to a fixed-width sparse vector and is shared read-only
//! across requests.

mod tfidf;

pub use tfidf::{Analyzer, FeatureUnion, Norm, TfidfParams, TfidfVectorizer};

use crate::error::Result;
use crate::models::FeatureVector;
use serde::Deserialize;
use std::sync::Arc;

/// Logical name the feature extractor is cached and reported under
pub const VECTORIZER_KEY: &str = "vectorizer";

/// Trait for pre-fitted text transformers
pub trait FeatureExtractor: Send + Sync {
    /// Map one text to its feature vector
    fn transform(&self, text: &str) -> Result<FeatureVector>;

    /// Width of every vector this extractor produces
    fn dimension(&self) -> usize;
}

/// Persisted description of a feature extractor
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractorSpec {
    Tfidf(TfidfParams),
    Union { parts: Vec<TfidfParams> },
}

impl ExtractorSpec {
    /// Validate the fitted parameters and build the runnable extractor
    pub fn build(self) -> Result<Arc<dyn FeatureExtractor>> {
        match self {
            ExtractorSpec::Tfidf(params) => Ok(Arc::new(TfidfVectorizer::from_params(params)?)),
            ExtractorSpec::Union { parts } => {
                let parts = parts
                    .into_iter()
                    .map(TfidfVectorizer::from_params)
                    .collect::<Result<Vec<_>>>()?;
                Ok(Arc::new(FeatureUnion::new(parts)?))
            }
        }
    }
}
