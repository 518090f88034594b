//! Multinomial naive Bayes

use super::{require_uniform_width, ProbabilisticModel};
use crate::error::{DetectorError, Result};
use crate::models::FeatureVector;

#[derive(Debug, Clone)]
pub struct MultinomialNb {
    name: String,
    class_log_prior: Vec<f64>,
    feature_log_prob: Vec<Vec<f64>>,
}

impl MultinomialNb {
    /// One log-probability row per class, all of equal width
    pub fn new(
        name: impl Into<String>,
        class_log_prior: Vec<f64>,
        feature_log_prob: Vec<Vec<f64>>,
    ) -> Result<Self> {
        let name = name.into();
        if feature_log_prob.len() != class_log_prior.len() {
            return Err(DetectorError::invalid_artifact(format!(
                "{}: {} feature rows for {} classes",
                name,
                feature_log_prob.len(),
                class_log_prior.len()
            )));
        }
        require_uniform_width(&name, "feature_log_prob", &feature_log_prob)?;

        Ok(Self {
            name,
            class_log_prior,
            feature_log_prob,
        })
    }
}

impl ProbabilisticModel for MultinomialNb {
    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>> {
        let joint: Vec<f64> = self
            .class_log_prior
            .iter()
            .zip(&self.feature_log_prob)
            .map(|(prior, row)| {
                features.dot(row).map(|ll| prior + ll).ok_or_else(|| {
                    DetectorError::transform(
                        &self.name,
                        format!(
                            "feature dimension {} does not match {} log-probabilities",
                            features.dim(),
                            row.len()
                        ),
                    )
                })
            })
            .collect::<Result<_>>()?;

        let max = joint.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() {
            return Err(DetectorError::transform(&self.name, "non-finite joint likelihood"));
        }
        let exp: Vec<f64> = joint.iter().map(|j| (j - max).exp()).collect();
        let total: f64 = exp.iter().sum();
        Ok(exp.into_iter().map(|e| e / total).collect())
    }
}
