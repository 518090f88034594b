//! Server configuration

use anyhow::{Context, Result};
use detector_lib::{
    predictor::{DEFAULT_BEST_MODEL, DEFAULT_TEMPERATURE},
    store::DEFAULT_CLASSIFIERS,
    EnsembleConfig, Temperature,
};
use serde::Deserialize;
use std::path::PathBuf;

/// Server configuration, read from `DETECTOR_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Directory holding the vectorizer and classifier artifacts
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,

    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Calibration temperature applied to every classifier
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Shortest accepted input, in characters after trimming
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,

    #[serde(default = "default_best_model")]
    pub best_model: String,

    /// Attach input and label-set details to JSON responses
    #[serde(default)]
    pub debug_api: bool,

    #[serde(default = "default_instance_name")]
    pub instance_name: String,
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_api_port() -> u16 {
    5000
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

fn default_min_text_chars() -> usize {
    50
}

fn default_best_model() -> String {
    DEFAULT_BEST_MODEL.to_string()
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "text-detector".to_string())
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            models_dir: default_models_dir(),
            api_port: default_api_port(),
            temperature: default_temperature(),
            min_text_chars: default_min_text_chars(),
            best_model: default_best_model(),
            debug_api: false,
            instance_name: default_instance_name(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the process environment
    pub fn load() -> Result<Self> {
        Self::from_environment(config::Environment::with_prefix("DETECTOR"))
    }

    /// Load configuration from an explicit environment source
    pub fn from_environment(env: config::Environment) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(env.try_parsing(true))
            .build()
            .context("failed to read configuration")?;

        let config: ServerConfig = settings
            .try_deserialize()
            .context("invalid DETECTOR_* configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.temperature()?;
        if self.best_model.trim().is_empty() {
            anyhow::bail!("best_model must not be empty");
        }
        Ok(())
    }

    pub fn temperature(&self) -> Result<Temperature> {
        Temperature::new(self.temperature).context("invalid temperature")
    }

    /// Ensemble settings for the default classifier set
    pub fn ensemble_config(&self) -> Result<EnsembleConfig> {
        Ok(EnsembleConfig {
            classifiers: DEFAULT_CLASSIFIERS.iter().map(|s| s.to_string()).collect(),
            temperature: self.temperature()?,
            best_model: self.best_model.clone(),
        })
    }
}
