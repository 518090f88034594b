//! Ensemble aggregation over the configured classifiers

use super::calibration::Temperature;
use super::extractor::{extract_distribution, ClassDistribution};
use crate::error::{DetectorError, Result};
use crate::features::VECTORIZER_KEY;
use crate::models::{
    EnsembleResult, FeatureVector, OverallResult, PerModelResult, Verdict, AI_LABEL, HUMAN_LABEL,
};
use crate::observability::DetectorMetrics;
use crate::store::{ModelStore, DEFAULT_CLASSIFIERS};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Classifier reported as best by default, from offline evaluation
pub const DEFAULT_BEST_MODEL: &str = "SGDClassifier";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleConfig {
    /// Classifier identifiers, in the order results are reported
    pub classifiers: Vec<String>,
    pub temperature: Temperature,
    /// Static identifier echoed in every result; not chosen per request
    pub best_model: String,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            classifiers: DEFAULT_CLASSIFIERS.iter().map(|s| s.to_string()).collect(),
            temperature: Temperature::default(),
            best_model: DEFAULT_BEST_MODEL.to_string(),
        }
    }
}

/// Runs every configured classifier over a text and averages the results
pub struct EnsemblePredictor {
    store: Arc<ModelStore>,
    config: EnsembleConfig,
    metrics: DetectorMetrics,
}

impl EnsemblePredictor {
    pub fn new(store: Arc<ModelStore>, config: EnsembleConfig) -> Self {
        Self {
            store,
            config,
            metrics: DetectorMetrics::new(),
        }
    }

    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<ModelStore> {
        &self.store
    }

    /// Score `text` with the named classifier alone
    pub fn predict_one(&self, text: &str, model_name: &str) -> Result<PerModelResult> {
        let features = self.features(text)?;
        self.score(model_name, &features)
    }

    /// Score `text` with every configured classifier.
    ///
    /// A classifier that fails is logged and left out. Fails with
    /// `NoUsableModel` only when nothing survives.
    pub fn predict_all(&self, text: &str) -> Result<EnsembleResult> {
        let started = Instant::now();
        let attempted = self.config.classifiers.len();

        let features = match self.features(text) {
            Ok(features) => features,
            Err(e @ DetectorError::InvalidInput(_)) => return Err(e),
            Err(e) => {
                warn!(error = %e, "Feature extraction failed, no classifier can run");
                self.metrics.inc_model_failure(VECTORIZER_KEY);
                return Err(DetectorError::NoUsableModel {
                    attempted,
                    cause: format!("feature extraction failed: {}", e),
                });
            }
        };

        let mut models = Vec::with_capacity(attempted);
        for name in &self.config.classifiers {
            match self.score(name, &features) {
                Ok(result) => models.push(result),
                Err(e) => {
                    warn!(model = %name, error = %e, "Classifier failed, excluded from ensemble");
                    self.metrics.inc_model_failure(name);
                }
            }
        }

        if models.is_empty() {
            return Err(DetectorError::NoUsableModel {
                attempted,
                cause: format!("all {} classifiers failed", attempted),
            });
        }

        let overall = aggregate(&models);
        self.metrics.inc_predictions(overall.prediction);
        self.metrics
            .observe_prediction_latency(started.elapsed().as_secs_f64());

        Ok(EnsembleResult {
            overall,
            models,
            best_model: self.config.best_model.clone(),
        })
    }

    fn features(&self, text: &str) -> Result<FeatureVector> {
        if text.trim().is_empty() {
            return Err(DetectorError::invalid_input("text is empty"));
        }
        let extractor = self.store.feature_extractor()?;
        extractor.transform(text)
    }

    fn score(&self, name: &str, features: &FeatureVector) -> Result<PerModelResult> {
        let classifier = self.store.classifier(name)?;
        let raw = extract_distribution(&classifier, features)?;
        let calibrated = raw.with_probabilities(self.config.temperature.apply(raw.probabilities()));

        debug!(
            model = %name,
            labels = ?raw.labels(),
            raw = ?raw.probabilities(),
            calibrated = ?calibrated.probabilities(),
            temperature = self.config.temperature.value(),
            "Class distribution"
        );

        let ai = label_probability(name, &calibrated, AI_LABEL)?;
        let human = label_probability(name, &calibrated, HUMAN_LABEL)?;

        Ok(PerModelResult {
            model_name: name.to_string(),
            prediction: Verdict::from_probabilities(ai, human),
            ai_probability: round2(ai * 100.0),
            human_probability: round2(human * 100.0),
        })
    }
}

fn label_probability(model: &str, dist: &ClassDistribution, label: &str) -> Result<f64> {
    dist.probability_of(label).ok_or_else(|| {
        DetectorError::transform(
            model,
            format!("label set {:?} has no '{}' label", dist.labels(), label),
        )
    })
}

/// Mean of the per-model percentages; the verdict is decided before rounding
fn aggregate(models: &[PerModelResult]) -> OverallResult {
    let n = models.len() as f64;
    let ai = models.iter().map(|m| m.ai_probability).sum::<f64>() / n;
    let human = models.iter().map(|m| m.human_probability).sum::<f64>() / n;

    OverallResult {
        prediction: Verdict::from_probabilities(ai, human),
        ai_probability: round2(ai),
        human_probability: round2(human),
    }
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        ai_human, failing_factory, label_factory, labels, margin_factory, proba_factory,
        StubLoader,
    };
    use proptest::prelude::*;

    const TEXT: &str = "The quick brown fox jumps over the lazy dog, twice for good measure.";

    fn predictor(loader: StubLoader, temperature: f64) -> EnsemblePredictor {
        let store = Arc::new(ModelStore::with_default_classifiers(Arc::new(loader)));
        let config = EnsembleConfig {
            temperature: Temperature::new(temperature).unwrap(),
            ..EnsembleConfig::default()
        };
        EnsemblePredictor::new(store, config)
    }

    fn all_proba(probs: Vec<f64>) -> StubLoader {
        DEFAULT_CLASSIFIERS
            .iter()
            .fold(StubLoader::new(), |loader, name| {
                loader.with_classifier(name, proba_factory(ai_human(), probs.clone()))
            })
    }

    #[test]
    fn test_three_agreeing_classifiers() {
        let p = predictor(all_proba(vec![0.7, 0.3]), 1.0);
        let result = p.predict_all(TEXT).unwrap();

        assert_eq!(result.overall.prediction, Verdict::Ai);
        assert_eq!(result.overall.ai_probability, 70.0);
        assert_eq!(result.overall.human_probability, 30.0);
        assert_eq!(result.models.len(), 3);
        assert_eq!(result.best_model, "SGDClassifier");
    }

    #[test]
    fn test_results_follow_configured_order() {
        let p = predictor(all_proba(vec![0.6, 0.4]), 6.0);
        let result = p.predict_all(TEXT).unwrap();
        let names: Vec<&str> = result.models.iter().map(|m| m.model_name.as_str()).collect();
        assert_eq!(names, DEFAULT_CLASSIFIERS.to_vec());
    }

    #[test]
    fn test_zero_margin_stays_even_at_any_temperature() {
        for t in [0.5, 1.0, 6.0, 20.0] {
            let loader = StubLoader::new().with_classifier("SGDClassifier", margin_factory(ai_human(), 0.0));
            let p = predictor(loader, t);
            let result = p.predict_one(TEXT, "SGDClassifier").unwrap();
            assert_eq!(result.ai_probability, 50.0);
            assert_eq!(result.human_probability, 50.0);
            assert_eq!(result.prediction, Verdict::Human);
        }
    }

    #[test]
    fn test_labels_read_by_name_not_position() {
        let loader = StubLoader::new().with_classifier(
            "MultinomialNB",
            proba_factory(labels(&["human", "ai"]), vec![0.2, 0.8]),
        );
        let p = predictor(loader, 1.0);
        let result = p.predict_one(TEXT, "MultinomialNB").unwrap();
        assert_eq!(result.ai_probability, 80.0);
        assert_eq!(result.prediction, Verdict::Ai);
    }

    #[test]
    fn test_two_failing_classifiers_leave_one() {
        let loader = StubLoader::new()
            .with_classifier("LogisticRegression", failing_factory())
            .with_classifier("MultinomialNB", failing_factory())
            .with_classifier("SGDClassifier", proba_factory(ai_human(), vec![0.1, 0.9]));
        let p = predictor(loader, 1.0);
        let result = p.predict_all(TEXT).unwrap();

        assert_eq!(result.models.len(), 1);
        assert_eq!(result.models[0].model_name, "SGDClassifier");
        assert_eq!(result.overall.prediction, Verdict::Human);
        assert_eq!(result.overall.human_probability, 90.0);
    }

    #[test]
    fn test_missing_artifact_excluded() {
        let loader = StubLoader::new()
            .with_classifier("LogisticRegression", proba_factory(ai_human(), vec![0.55, 0.45]));
        let p = predictor(loader, 1.0);
        let result = p.predict_all(TEXT).unwrap();
        assert_eq!(result.models.len(), 1);
        assert_eq!(result.overall.ai_probability, 55.0);
    }

    #[test]
    fn test_all_failing_is_no_usable_model() {
        let loader = DEFAULT_CLASSIFIERS
            .iter()
            .fold(StubLoader::new(), |l, name| l.with_classifier(name, failing_factory()));
        let p = predictor(loader, 6.0);
        let err = p.predict_all(TEXT).unwrap_err();
        assert!(matches!(err, DetectorError::NoUsableModel { attempted: 3, .. }));
        assert!(err.to_string().contains("all 3 classifiers failed"));
    }

    #[test]
    fn test_extraction_failure_is_no_usable_model() {
        let p = predictor(all_proba(vec![0.7, 0.3]), 6.0);
        let err = p.predict_all("please FAIL_EXTRACT this one").unwrap_err();
        assert!(matches!(err, DetectorError::NoUsableModel { .. }));
        let message = err.to_string();
        assert!(message.contains("feature extraction failed"), "{}", message);
        assert!(!message.contains("classifiers failed"), "{}", message);
    }

    #[test]
    fn test_empty_text_is_invalid_input() {
        let p = predictor(all_proba(vec![0.7, 0.3]), 6.0);
        assert!(matches!(p.predict_all("   \n"), Err(DetectorError::InvalidInput(_))));
        assert!(matches!(
            p.predict_one("", "SGDClassifier"),
            Err(DetectorError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_tie_goes_to_human() {
        let loader = StubLoader::new()
            .with_classifier("LogisticRegression", proba_factory(ai_human(), vec![0.8, 0.2]))
            .with_classifier("MultinomialNB", proba_factory(ai_human(), vec![0.2, 0.8]));
        let p = predictor(loader, 1.0);
        let result = p.predict_all(TEXT).unwrap();
        assert_eq!(result.overall.ai_probability, 50.0);
        assert_eq!(result.overall.prediction, Verdict::Human);
    }

    #[test]
    fn test_label_only_is_calibrated() {
        let loader = StubLoader::new().with_classifier("SGDClassifier", label_factory(ai_human(), "ai"));
        let p = predictor(loader, 6.0);
        let result = p.predict_one(TEXT, "SGDClassifier").unwrap();
        assert_eq!(result.prediction, Verdict::Ai);
        assert!(result.ai_probability > 50.0 && result.ai_probability < 100.0);
        assert!((result.ai_probability + result.human_probability - 100.0).abs() <= 0.01);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(66.666666), 66.67);
        assert_eq!(round2(12.344), 12.34);
        assert_eq!(round2(70.0), 70.0);
    }

    proptest! {
        #[test]
        fn prop_per_model_sums_to_hundred(ai in 0.0f64..=1.0, t in 0.1f64..20.0) {
            let loader = StubLoader::new()
                .with_classifier("LogisticRegression", proba_factory(ai_human(), vec![ai, 1.0 - ai]));
            let p = predictor(loader, t);
            let result = p.predict_one(TEXT, "LogisticRegression").unwrap();
            // Each side rounds independently, so the sum may drift by one hundredth
            prop_assert!((result.ai_probability + result.human_probability - 100.0).abs() <= 0.01 + 1e-9);
        }

        #[test]
        fn prop_overall_is_mean_of_models(
            a in 0.0f64..=1.0,
            b in 0.0f64..=1.0,
            d in -10.0f64..10.0,
            t in 0.1f64..20.0,
        ) {
            let loader = StubLoader::new()
                .with_classifier("LogisticRegression", proba_factory(ai_human(), vec![a, 1.0 - a]))
                .with_classifier("MultinomialNB", proba_factory(labels(&["human", "ai"]), vec![b, 1.0 - b]))
                .with_classifier("SGDClassifier", margin_factory(ai_human(), d));
            let p = predictor(loader, t);
            let result = p.predict_all(TEXT).unwrap();

            let mean_ai = result.models.iter().map(|m| m.ai_probability).sum::<f64>() / 3.0;
            let mean_human = result.models.iter().map(|m| m.human_probability).sum::<f64>() / 3.0;
            prop_assert!((result.overall.ai_probability - mean_ai).abs() <= 0.01);
            prop_assert!((result.overall.human_probability - mean_human).abs() <= 0.01);
            let expected = if mean_ai > mean_human { Verdict::Ai } else { Verdict::Human };
            prop_assert_eq!(result.overall.prediction, expected);
        }
    }
}
