//! Binary linear models (logistic regression, SGD, linear SVM)

use super::{sigmoid, MarginModel, ProbabilisticModel};
use crate::error::{DetectorError, Result};
use crate::models::FeatureVector;

/// Weight row and bias of a fitted binary linear model
#[derive(Debug, Clone)]
pub struct LinearModel {
    name: String,
    coef: Vec<f64>,
    intercept: f64,
}

impl LinearModel {
    pub fn new(name: impl Into<String>, coef: Vec<f64>, intercept: f64) -> Self {
        Self {
            name: name.into(),
            coef,
            intercept,
        }
    }

    /// Signed distance `w·x + b`; positive favors the second class
    pub fn decision(&self, features: &FeatureVector) -> Result<f64> {
        let d = features
            .dot(&self.coef)
            .map(|dot| dot + self.intercept)
            .ok_or_else(|| {
                DetectorError::transform(
                    &self.name,
                    format!(
                        "feature dimension {} does not match {} coefficients",
                        features.dim(),
                        self.coef.len()
                    ),
                )
            })?;

        if !d.is_finite() {
            return Err(DetectorError::transform(&self.name, "non-finite decision value"));
        }
        Ok(d)
    }
}

impl MarginModel for LinearModel {
    fn decision_function(&self, features: &FeatureVector) -> Result<f64> {
        self.decision(features)
    }
}

/// How a linear model turns its decision value into a probability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinearLink {
    Logistic,
    ModifiedHuber,
}

impl LinearLink {
    /// Losses with a native probability estimate; others stay margin-based
    pub fn for_loss(loss: &str) -> Option<Self> {
        match loss {
            "log_loss" | "log" => Some(LinearLink::Logistic),
            "modified_huber" => Some(LinearLink::ModifiedHuber),
            _ => None,
        }
    }

    fn positive_probability(&self, decision: f64) -> f64 {
        match self {
            LinearLink::Logistic => sigmoid(decision),
            LinearLink::ModifiedHuber => (decision.clamp(-1.0, 1.0) + 1.0) / 2.0,
        }
    }
}

/// Linear model with a probability estimate over its two classes
#[derive(Debug, Clone)]
pub struct LinearProbabilistic {
    model: LinearModel,
    link: LinearLink,
}

impl LinearProbabilistic {
    pub fn new(model: LinearModel, link: LinearLink) -> Self {
        Self { model, link }
    }
}

impl ProbabilisticModel for LinearProbabilistic {
    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>> {
        let p = self.link.positive_probability(self.model.decision(features)?);
        Ok(vec![1.0 - p, p])
    }
}
