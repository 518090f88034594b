//! Temperature scaling of probability distributions

use crate::error::{DetectorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default temperature; keeps reported confidence in a moderate band
pub const DEFAULT_TEMPERATURE: f64 = 6.0;

/// Guard against `ln(0)`
const LOG_EPSILON: f64 = 1e-10;

/// A validated temperature: finite and strictly positive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Temperature(f64);

impl Temperature {
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() || value <= 0.0 {
            return Err(DetectorError::config(format!(
                "temperature must be finite and > 0, got {}",
                value
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Rescale `probs` at this temperature
    pub fn apply(&self, probs: &[f64]) -> Vec<f64> {
        temperature_scale(probs, self.0)
    }
}

impl Default for Temperature {
    fn default() -> Self {
        Self(DEFAULT_TEMPERATURE)
    }
}

impl TryFrom<f64> for Temperature {
    type Error = DetectorError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Temperature> for f64 {
    fn from(t: Temperature) -> f64 {
        t.0
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Softmax of `ln(p + eps) / t`. At `t == 1` the input is returned as is.
pub fn temperature_scale(probs: &[f64], t: f64) -> Vec<f64> {
    if t == 1.0 {
        return probs.to_vec();
    }

    let logits: Vec<f64> = probs.iter().map(|p| (p + LOG_EPSILON).ln() / t).collect();
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let total: f64 = exp.iter().sum();
    exp.into_iter().map(|e| e / total).collect()
}
