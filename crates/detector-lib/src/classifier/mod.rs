//! Pre-fitted binary classifiers
//!
//! Each loaded classifier carries its own ordered label set and exactly one
//! capability, decided once at load time:
//! - probabilistic: a full distribution over the label set
//! - margin-based: a single real-valued decision score
//! - label-only: a hard prediction

mod centroid;
mod linear;
mod naive_bayes;

pub use centroid::NearestCentroid;
pub use linear::{LinearLink, LinearModel, LinearProbabilistic};
pub use naive_bayes::MultinomialNb;

use crate::error::{DetectorError, Result};
use crate::models::FeatureVector;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Classifier that exposes a probability per label, in label-set order
pub trait ProbabilisticModel: Send + Sync {
    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>>;
}

/// Classifier that exposes a signed decision score; positive favors the second label
pub trait MarginModel: Send + Sync {
    fn decision_function(&self, features: &FeatureVector) -> Result<f64>;
}

/// Classifier that only exposes its predicted label
pub trait LabelModel: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<String>;
}

/// The native capability surface of a loaded classifier
pub enum Capability {
    Probabilistic(Box<dyn ProbabilisticModel>),
    MarginBased(Box<dyn MarginModel>),
    LabelOnly(Box<dyn LabelModel>),
}

impl Capability {
    pub fn tier(&self) -> CapabilityTier {
        match self {
            Capability::Probabilistic(_) => CapabilityTier::Probabilistic,
            Capability::MarginBased(_) => CapabilityTier::MarginBased,
            Capability::LabelOnly(_) => CapabilityTier::LabelOnly,
        }
    }
}

/// Capability kind without the model, for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityTier {
    Probabilistic,
    MarginBased,
    LabelOnly,
}

impl fmt::Display for CapabilityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CapabilityTier::Probabilistic => "probabilistic",
            CapabilityTier::MarginBased => "margin_based",
            CapabilityTier::LabelOnly => "label_only",
        };
        f.write_str(s)
    }
}

/// A loaded classifier: identifier, ordered label set and capability
pub struct Classifier {
    name: String,
    labels: Vec<String>,
    capability: Capability,
}

impl Classifier {
    /// Labels must be unique and at least two; margin-based models need exactly two
    pub fn new(name: impl Into<String>, labels: Vec<String>, capability: Capability) -> Result<Self> {
        let name = name.into();

        if labels.len() < 2 {
            return Err(DetectorError::invalid_artifact(format!(
                "classifier {} has {} labels, need at least 2",
                name,
                labels.len()
            )));
        }
        let unique: HashSet<&str> = labels.iter().map(String::as_str).collect();
        if unique.len() != labels.len() {
            return Err(DetectorError::invalid_artifact(format!(
                "classifier {} has duplicate labels {:?}",
                name, labels
            )));
        }
        if matches!(capability, Capability::MarginBased(_)) && labels.len() != 2 {
            return Err(DetectorError::invalid_artifact(format!(
                "margin-based classifier {} must be binary, got labels {:?}",
                name, labels
            )));
        }

        Ok(Self {
            name,
            labels,
            capability,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Label set in the model's own order
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    pub fn capability_tier(&self) -> CapabilityTier {
        self.capability.tier()
    }
}

impl fmt::Debug for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Classifier")
            .field("name", &self.name)
            .field("labels", &self.labels)
            .field("capability", &self.capability.tier())
            .finish()
    }
}

/// Numerically stable logistic function
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

fn default_sgd_loss() -> String {
    "hinge".to_string()
}

/// Persisted description of a fitted classifier
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierSpec {
    LogisticRegression {
        classes: Vec<String>,
        coef: Vec<f64>,
        intercept: f64,
    },
    Sgd {
        classes: Vec<String>,
        coef: Vec<f64>,
        intercept: f64,
        #[serde(default = "default_sgd_loss")]
        loss: String,
    },
    LinearSvc {
        classes: Vec<String>,
        coef: Vec<f64>,
        intercept: f64,
    },
    MultinomialNb {
        classes: Vec<String>,
        class_log_prior: Vec<f64>,
        feature_log_prob: Vec<Vec<f64>>,
    },
    NearestCentroid {
        classes: Vec<String>,
        centroids: Vec<Vec<f64>>,
    },
}

/// Linear kinds score a single margin, so they only separate two classes
fn require_binary(name: &str, classes: &[String]) -> Result<()> {
    if classes.len() != 2 {
        return Err(DetectorError::invalid_artifact(format!(
            "{}: linear classifier must be binary, got classes {:?}",
            name, classes
        )));
    }
    Ok(())
}

/// Per-class weight rows must all have the same width
pub(crate) fn require_uniform_width(name: &str, field: &str, rows: &[Vec<f64>]) -> Result<()> {
    if let Some(first) = rows.first() {
        if rows.iter().any(|row| row.len() != first.len()) {
            return Err(DetectorError::invalid_artifact(format!(
                "{}: {} rows differ in width",
                name, field
            )));
        }
    }
    Ok(())
}

impl ClassifierSpec {
    /// Build the runnable classifier, fixing its capability from the artifact kind
    pub fn build(self, name: &str) -> Result<Classifier> {
        match self {
            ClassifierSpec::LogisticRegression {
                classes,
                coef,
                intercept,
            } => {
                require_binary(name, &classes)?;
                let model = LinearModel::new(name, coef, intercept);
                let capability = Capability::Probabilistic(Box::new(LinearProbabilistic::new(
                    model,
                    LinearLink::Logistic,
                )));
                Classifier::new(name, classes, capability)
            }
            ClassifierSpec::Sgd {
                classes,
                coef,
                intercept,
                loss,
            } => {
                require_binary(name, &classes)?;
                let model = LinearModel::new(name, coef, intercept);
                let capability = match LinearLink::for_loss(&loss) {
                    Some(link) => {
                        Capability::Probabilistic(Box::new(LinearProbabilistic::new(model, link)))
                    }
                    None => Capability::MarginBased(Box::new(model)),
                };
                Classifier::new(name, classes, capability)
            }
            ClassifierSpec::LinearSvc {
                classes,
                coef,
                intercept,
            } => {
                let model = LinearModel::new(name, coef, intercept);
                Classifier::new(name, classes, Capability::MarginBased(Box::new(model)))
            }
            ClassifierSpec::MultinomialNb {
                classes,
                class_log_prior,
                feature_log_prob,
            } => {
                if class_log_prior.len() != classes.len() {
                    return Err(DetectorError::invalid_artifact(format!(
                        "{}: {} class priors for {} classes",
                        name,
                        class_log_prior.len(),
                        classes.len()
                    )));
                }
                let model = MultinomialNb::new(name, class_log_prior, feature_log_prob)?;
                Classifier::new(name, classes, Capability::Probabilistic(Box::new(model)))
            }
            ClassifierSpec::NearestCentroid { classes, centroids } => {
                let model = NearestCentroid::new(name, classes.clone(), centroids)?;
                Classifier::new(name, classes, Capability::LabelOnly(Box::new(model)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sigmoid_symmetric_and_stable() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!((sigmoid(2.0) + sigmoid(-2.0) - 1.0).abs() < 1e-15);
        assert!(sigmoid(-1000.0) >= 0.0);
        assert!(sigmoid(1000.0) <= 1.0);
        assert!(sigmoid(-1000.0).is_finite());
    }

    #[test]
    fn test_classifier_rejects_duplicate_labels() {
        let model = LinearModel::new("m", vec![1.0], 0.0);
        let result = Classifier::new(
            "m",
            labels(&["ai", "ai"]),
            Capability::MarginBased(Box::new(model)),
        );
        assert!(matches!(result, Err(DetectorError::InvalidArtifact(_))));
    }

    #[test]
    fn test_margin_classifier_must_be_binary() {
        let model = LinearModel::new("m", vec![1.0], 0.0);
        let result = Classifier::new(
            "m",
            labels(&["ai", "human", "mixed"]),
            Capability::MarginBased(Box::new(model)),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_probabilistic_linear_kinds_must_be_binary() {
        let cases = [
            r#"{"kind": "logistic_regression", "classes": ["ai", "human", "mixed"], "coef": [1.0], "intercept": 0.0}"#,
            r#"{"kind": "sgd", "classes": ["ai", "human", "mixed"], "coef": [1.0], "intercept": 0.0, "loss": "log_loss"}"#,
            r#"{"kind": "sgd", "classes": ["ai", "human", "mixed"], "coef": [1.0], "intercept": 0.0, "loss": "modified_huber"}"#,
            r#"{"kind": "sgd", "classes": ["ai", "human", "mixed"], "coef": [1.0], "intercept": 0.0}"#,
        ];

        for json in cases {
            let spec: ClassifierSpec = serde_json::from_str(json).unwrap();
            let result = spec.build("model");
            assert!(
                matches!(result, Err(DetectorError::InvalidArtifact(_))),
                "{}",
                json
            );
        }
    }

    #[test]
    fn test_capability_fixed_from_kind() {
        let cases = [
            (
                r#"{"kind": "logistic_regression", "classes": ["ai", "human"], "coef": [1.0], "intercept": 0.0}"#,
                CapabilityTier::Probabilistic,
            ),
            (
                r#"{"kind": "sgd", "classes": ["ai", "human"], "coef": [1.0], "intercept": 0.0, "loss": "log_loss"}"#,
                CapabilityTier::Probabilistic,
            ),
            (
                r#"{"kind": "sgd", "classes": ["ai", "human"], "coef": [1.0], "intercept": 0.0}"#,
                CapabilityTier::MarginBased,
            ),
            (
                r#"{"kind": "linear_svc", "classes": ["ai", "human"], "coef": [1.0], "intercept": 0.0}"#,
                CapabilityTier::MarginBased,
            ),
            (
                r#"{"kind": "multinomial_nb", "classes": ["ai", "human"], "class_log_prior": [-0.69, -0.69], "feature_log_prob": [[0.0], [0.0]]}"#,
                CapabilityTier::Probabilistic,
            ),
            (
                r#"{"kind": "nearest_centroid", "classes": ["ai", "human"], "centroids": [[1.0], [0.0]]}"#,
                CapabilityTier::LabelOnly,
            ),
        ];

        for (json, tier) in cases {
            let spec: ClassifierSpec = serde_json::from_str(json).unwrap();
            let classifier = spec.build("model").unwrap();
            assert_eq!(classifier.capability_tier(), tier, "{}", json);
            assert_eq!(classifier.labels(), &["ai".to_string(), "human".to_string()]);
        }
    }

    #[test]
    fn test_naive_bayes_prior_count_checked() {
        let json = r#"{"kind": "multinomial_nb", "classes": ["ai", "human"],
                       "class_log_prior": [-0.69], "feature_log_prob": [[0.0], [0.0]]}"#;
        let spec: ClassifierSpec = serde_json::from_str(json).unwrap();
        assert!(spec.build("MultinomialNB").is_err());
    }

    #[test]
    fn test_tier_display() {
        assert_eq!(CapabilityTier::MarginBased.to_string(), "margin_based");
        assert_eq!(
            serde_json::to_string(&CapabilityTier::LabelOnly).unwrap(),
            "\"label_only\""
        );
    }
}
