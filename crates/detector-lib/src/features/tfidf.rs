//! TF-IDF vectorizers over word and character n-grams

use super::{FeatureExtractor, VECTORIZER_KEY};
use crate::error::{DetectorError, Result};
use crate::models::FeatureVector;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;

/// Tokens are maximal runs of two or more word characters
const TOKEN_PATTERN: &str = r"\b\w\w+\b";

/// Whitespace runs collapsed before character n-grams are taken
const WHITESPACE_PATTERN: &str = r"\s\s+";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Analyzer {
    Word,
    Char,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    L1,
    L2,
}

fn default_true() -> bool {
    true
}

fn default_norm() -> Option<Norm> {
    Some(Norm::L2)
}

/// Fitted parameters of one TF-IDF vectorizer
#[derive(Debug, Clone, Deserialize)]
pub struct TfidfParams {
    pub analyzer: Analyzer,
    pub ngram_range: (usize, usize),
    #[serde(default = "default_true")]
    pub lowercase: bool,
    #[serde(default)]
    pub sublinear_tf: bool,
    #[serde(default = "default_true")]
    pub use_idf: bool,
    #[serde(default = "default_norm")]
    pub norm: Option<Norm>,
    pub vocabulary: HashMap<String, usize>,
    #[serde(default)]
    pub idf: Vec<f64>,
}

/// Runnable TF-IDF vectorizer
#[derive(Debug)]
pub struct TfidfVectorizer {
    params: TfidfParams,
    token_re: Regex,
    whitespace_re: Regex,
}

impl TfidfVectorizer {
    pub fn from_params(params: TfidfParams) -> Result<Self> {
        let (min_n, max_n) = params.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(DetectorError::invalid_artifact(format!(
                "ngram_range ({}, {}) must satisfy 1 <= min <= max",
                min_n, max_n
            )));
        }

        let width = params.vocabulary.len();
        if let Some((term, col)) = params.vocabulary.iter().find(|(_, col)| **col >= width) {
            return Err(DetectorError::invalid_artifact(format!(
                "vocabulary term '{}' maps to column {} beyond width {}",
                term, col, width
            )));
        }
        if params.use_idf && params.idf.len() != width {
            return Err(DetectorError::invalid_artifact(format!(
                "idf has {} weights for a vocabulary of {}",
                params.idf.len(),
                width
            )));
        }

        let token_re = Regex::new(TOKEN_PATTERN)
            .map_err(|e| DetectorError::invalid_artifact(format!("token pattern: {}", e)))?;
        let whitespace_re = Regex::new(WHITESPACE_PATTERN)
            .map_err(|e| DetectorError::invalid_artifact(format!("whitespace pattern: {}", e)))?;

        Ok(Self {
            params,
            token_re,
            whitespace_re,
        })
    }

    /// Count in-vocabulary n-grams of the document
    fn term_counts(&self, doc: &str) -> HashMap<usize, f64> {
        let (min_n, max_n) = self.params.ngram_range;
        let vocabulary = &self.params.vocabulary;
        let mut counts: HashMap<usize, f64> = HashMap::new();
        let mut count = |gram: &str| {
            if let Some(&col) = vocabulary.get(gram) {
                *counts.entry(col).or_default() += 1.0;
            }
        };

        match self.params.analyzer {
            Analyzer::Word => {
                let tokens: Vec<&str> = self.token_re.find_iter(doc).map(|m| m.as_str()).collect();
                for n in min_n..=max_n.min(tokens.len()) {
                    for window in tokens.windows(n) {
                        count(&window.join(" "));
                    }
                }
            }
            Analyzer::Char => {
                let collapsed = self.whitespace_re.replace_all(doc, " ");
                let chars: Vec<char> = collapsed.chars().collect();
                for n in min_n..=max_n.min(chars.len()) {
                    for window in chars.windows(n) {
                        count(&window.iter().collect::<String>());
                    }
                }
            }
        }

        counts
    }
}

impl FeatureExtractor for TfidfVectorizer {
    fn transform(&self, text: &str) -> Result<FeatureVector> {
        let doc = if self.params.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };

        let mut entries: Vec<(usize, f64)> = self
            .term_counts(&doc)
            .into_iter()
            .map(|(col, count)| {
                let tf = if self.params.sublinear_tf {
                    1.0 + count.ln()
                } else {
                    count
                };
                let idf = if self.params.use_idf {
                    self.params.idf[col]
                } else {
                    1.0
                };
                (col, tf * idf)
            })
            .collect();

        let norm = match self.params.norm {
            Some(Norm::L2) => entries.iter().map(|(_, v)| v * v).sum::<f64>().sqrt(),
            Some(Norm::L1) => entries.iter().map(|(_, v)| v.abs()).sum::<f64>(),
            None => 1.0,
        };
        if norm > 0.0 {
            for (_, v) in entries.iter_mut() {
                *v /= norm;
            }
        }

        FeatureVector::from_entries(self.dimension(), entries)
            .map_err(|e| DetectorError::transform(VECTORIZER_KEY, e.to_string()))
    }

    fn dimension(&self) -> usize {
        self.params.vocabulary.len()
    }
}

/// Several vectorizers whose outputs are concatenated column-wise
#[derive(Debug)]
pub struct FeatureUnion {
    parts: Vec<TfidfVectorizer>,
}

impl FeatureUnion {
    pub fn new(parts: Vec<TfidfVectorizer>) -> Result<Self> {
        if parts.is_empty() {
            return Err(DetectorError::invalid_artifact(
                "feature union needs at least one part",
            ));
        }
        Ok(Self { parts })
    }
}

impl FeatureExtractor for FeatureUnion {
    fn transform(&self, text: &str) -> Result<FeatureVector> {
        let parts = self
            .parts
            .iter()
            .map(|part| part.transform(text))
            .collect::<Result<Vec<_>>>()?;
        Ok(FeatureVector::concat(parts))
    }

    fn dimension(&self) -> usize {
        self.parts.iter().map(|p| p.dimension()).sum()
    }
}
