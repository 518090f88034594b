//! Nearest-centroid classifier (hard predictions only)

use super::{require_uniform_width, LabelModel};
use crate::error::{DetectorError, Result};
use crate::models::FeatureVector;

#[derive(Debug, Clone)]
pub struct NearestCentroid {
    name: String,
    classes: Vec<String>,
    centroids: Vec<Vec<f64>>,
    squared_norms: Vec<f64>,
}

impl NearestCentroid {
    pub fn new(
        name: impl Into<String>,
        classes: Vec<String>,
        centroids: Vec<Vec<f64>>,
    ) -> Result<Self> {
        let name = name.into();
        if centroids.len() != classes.len() {
            return Err(DetectorError::invalid_artifact(format!(
                "{}: {} centroids for {} classes",
                name,
                centroids.len(),
                classes.len()
            )));
        }
        require_uniform_width(&name, "centroid", &centroids)?;
        let squared_norms: Vec<f64> = centroids
            .iter()
            .map(|c| c.iter().map(|v| v * v).sum::<f64>())
            .collect();

        Ok(Self {
            name,
            classes,
            centroids,
            squared_norms,
        })
    }
}

impl LabelModel for NearestCentroid {
    fn predict(&self, features: &FeatureVector) -> Result<String> {
        let x_norm = features.squared_norm();
        let mut best: Option<(usize, f64)> = None;

        for (idx, (centroid, c_norm)) in self.centroids.iter().zip(&self.squared_norms).enumerate() {
            let dot = features.dot(centroid).ok_or_else(|| {
                DetectorError::transform(
                    &self.name,
                    format!(
                        "feature dimension {} does not match centroid width {}",
                        features.dim(),
                        centroid.len()
                    ),
                )
            })?;
            let distance = x_norm - 2.0 * dot + c_norm;
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((idx, distance));
            }
        }

        best.map(|(idx, _)| self.classes[idx].clone())
            .ok_or_else(|| DetectorError::transform(&self.name, "no centroids"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> NearestCentroid {
        NearestCentroid::new(
            "NearestCentroid",
            vec!["human".to_string(), "ai".to_string()],
            vec![vec![0.0, 1.0], vec![1.0, 0.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_picks_closest_centroid() {
        let m = model();
        assert_eq!(m.predict(&FeatureVector::from_dense(&[0.9, 0.1])).unwrap(), "ai");
        assert_eq!(m.predict(&FeatureVector::from_dense(&[0.1, 0.7])).unwrap(), "human");
    }

    #[test]
    fn test_equidistant_goes_to_first_class() {
        let m = model();
        assert_eq!(m.predict(&FeatureVector::from_dense(&[0.5, 0.5])).unwrap(), "human");
    }

    #[test]
    fn test_centroid_count_must_match() {
        let result = NearestCentroid::new("nc", vec!["ai".to_string()], vec![]);
        assert!(result.is_err());
    }

    #[test]
    fn test_ragged_centroids_rejected() {
        let result = NearestCentroid::new(
            "nc",
            vec!["ai".to_string(), "human".to_string()],
            vec![vec![1.0, 0.0], vec![0.0]],
        );
        assert!(matches!(result, Err(DetectorError::InvalidArtifact(_))));
    }
}
