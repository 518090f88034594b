//! Core data models for the text detector

use crate::error::{DetectorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label used by every classifier for machine-written text
pub const AI_LABEL: &str = "ai";

/// Label used by every classifier for human-written text
pub const HUMAN_LABEL: &str = "human";

/// Binary verdict of a single classifier or of the whole ensemble
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Ai,
    Human,
}

impl Verdict {
    /// "ai" only when the AI share strictly exceeds the human share; ties go to human
    pub fn from_probabilities(ai: f64, human: f64) -> Self {
        if ai > human {
            Verdict::Ai
        } else {
            Verdict::Human
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Ai => AI_LABEL,
            Verdict::Human => HUMAN_LABEL,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of running one classifier over one text.
/// Probabilities are percentages rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerModelResult {
    pub model_name: String,
    pub prediction: Verdict,
    pub ai_probability: f64,
    pub human_probability: f64,
}

/// Aggregate verdict across the surviving classifiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallResult {
    pub prediction: Verdict,
    pub ai_probability: f64,
    pub human_probability: f64,
}

/// Ensemble output returned to the serving shell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleResult {
    pub overall: OverallResult,
    pub models: Vec<PerModelResult>,
    pub best_model: String,
}

/// Sparse feature vector produced by a feature extractor.
///
/// Entries are `(column, value)` pairs sorted by column, with every column
/// strictly below `dim`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    dim: usize,
    entries: Vec<(usize, f64)>,
}

impl FeatureVector {
    /// Build from unsorted entries; duplicate columns are summed
    pub fn from_entries(dim: usize, mut entries: Vec<(usize, f64)>) -> Result<Self> {
        if let Some(&(col, _)) = entries.iter().find(|(col, _)| *col >= dim) {
            return Err(DetectorError::invalid_input(format!(
                "feature column {} out of range for dimension {}",
                col, dim
            )));
        }
        entries.sort_by_key(|(col, _)| *col);

        let mut merged: Vec<(usize, f64)> = Vec::with_capacity(entries.len());
        for (col, value) in entries {
            match merged.last_mut() {
                Some((last, acc)) if *last == col => *acc += value,
                _ => merged.push((col, value)),
            }
        }

        Ok(Self {
            dim,
            entries: merged,
        })
    }

    pub fn from_dense(values: &[f64]) -> Self {
        Self {
            dim: values.len(),
            entries: values
                .iter()
                .enumerate()
                .filter(|(_, v)| **v != 0.0)
                .map(|(i, v)| (i, *v))
                .collect(),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.entries.iter().copied()
    }

    pub fn squared_norm(&self) -> f64 {
        self.entries.iter().map(|(_, v)| v * v).sum()
    }

    /// Dot product with a dense weight row of the same dimension
    pub fn dot(&self, weights: &[f64]) -> Option<f64> {
        if weights.len() != self.dim {
            return None;
        }
        Some(self.entries.iter().map(|(col, v)| weights[*col] * v).sum())
    }

    /// Concatenate vectors column-wise, offsetting each part by the width of those before it
    pub fn concat(parts: Vec<FeatureVector>) -> Self {
        let mut dim = 0;
        let mut entries = Vec::with_capacity(parts.iter().map(|p| p.nnz()).sum());
        for part in parts {
            entries.extend(part.entries.into_iter().map(|(col, v)| (col + dim, v)));
            dim += part.dim;
        }
        Self { dim, entries }
    }
}
