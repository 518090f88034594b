//! Prediction engine: probability extraction, calibration and ensembling

mod calibration;
mod ensemble;
mod extractor;

pub use calibration::{temperature_scale, Temperature, DEFAULT_TEMPERATURE};
pub use ensemble::{round2, EnsembleConfig, EnsemblePredictor, DEFAULT_BEST_MODEL};
pub use extractor::{extract_distribution, ClassDistribution};
