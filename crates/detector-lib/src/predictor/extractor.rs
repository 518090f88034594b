//! Capability dispatch from any loaded classifier to a label distribution

use crate::classifier::{sigmoid, Capability, Classifier};
use crate::error::{DetectorError, Result};
use crate::models::FeatureVector;

/// Absolute tolerance on the sum of a native distribution
const SUM_TOLERANCE: f64 = 1e-6;

/// Probability per label, in the classifier's own label order
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDistribution {
    labels: Vec<String>,
    probabilities: Vec<f64>,
    predicted: String,
}

impl ClassDistribution {
    /// Pair probabilities with labels; the prediction is the arg-max (first wins on ties)
    pub fn new(labels: Vec<String>, probabilities: Vec<f64>) -> Result<Self> {
        if labels.len() != probabilities.len() || labels.is_empty() {
            return Err(DetectorError::invalid_input(format!(
                "{} probabilities for {} labels",
                probabilities.len(),
                labels.len()
            )));
        }

        let mut best = 0;
        for (idx, p) in probabilities.iter().enumerate() {
            if *p > probabilities[best] {
                best = idx;
            }
        }
        let predicted = labels[best].clone();

        Ok(Self {
            labels,
            probabilities,
            predicted,
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    /// The classifier's hard prediction
    pub fn predicted(&self) -> &str {
        &self.predicted
    }

    /// Probability bound to `label`, looked up by name
    pub fn probability_of(&self, label: &str) -> Option<f64> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|idx| self.probabilities[idx])
    }

    /// Same labels and hard prediction, new probabilities
    pub fn with_probabilities(&self, probabilities: Vec<f64>) -> Self {
        debug_assert_eq!(probabilities.len(), self.labels.len());
        Self {
            labels: self.labels.clone(),
            probabilities,
            predicted: self.predicted.clone(),
        }
    }
}

/// Produce a distribution over the classifier's labels, whatever its capability.
///
/// Probabilistic models report their own distribution. Margin-based models
/// map the decision value through the logistic function onto the second
/// label. Label-only models put all mass on their prediction.
pub fn extract_distribution(
    classifier: &Classifier,
    features: &FeatureVector,
) -> Result<ClassDistribution> {
    let labels = classifier.labels().to_vec();

    match classifier.capability() {
        Capability::Probabilistic(model) => {
            let raw = model.predict_proba(features)?;
            let probabilities = checked_distribution(classifier.name(), labels.len(), raw)?;
            ClassDistribution::new(labels, probabilities)
        }
        Capability::MarginBased(model) => {
            let decision = model.decision_function(features)?;
            if !decision.is_finite() {
                return Err(DetectorError::transform(
                    classifier.name(),
                    format!("non-finite decision value {}", decision),
                ));
            }
            let p = sigmoid(decision);
            ClassDistribution::new(labels, vec![1.0 - p, p])
        }
        Capability::LabelOnly(model) => {
            let predicted = model.predict(features)?;
            let idx = labels.iter().position(|l| *l == predicted).ok_or_else(|| {
                DetectorError::transform(
                    classifier.name(),
                    format!("predicted label '{}' not in {:?}", predicted, labels),
                )
            })?;
            let mut probabilities = vec![0.0; labels.len()];
            probabilities[idx] = 1.0;
            Ok(ClassDistribution {
                labels,
                probabilities,
                predicted,
            })
        }
    }
}

fn checked_distribution(model: &str, expected: usize, raw: Vec<f64>) -> Result<Vec<f64>> {
    if raw.len() != expected {
        return Err(DetectorError::transform(
            model,
            format!("{} probabilities for {} labels", raw.len(), expected),
        ));
    }
    if raw.iter().any(|p| !p.is_finite() || *p < 0.0) {
        return Err(DetectorError::transform(
            model,
            format!("invalid probabilities {:?}", raw),
        ));
    }

    let total: f64 = raw.iter().sum();
    if total <= 0.0 {
        return Err(DetectorError::transform(model, "probabilities sum to zero"));
    }
    if (total - 1.0).abs() <= SUM_TOLERANCE {
        return Ok(raw);
    }
    Ok(raw.into_iter().map(|p| p / total).collect())
}
