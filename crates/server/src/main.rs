//! Text Detector - AI versus human text classification service
//!
//! Loads the vectorizer and classifiers from the models directory and serves
//! the ensemble over HTTP.

use anyhow::Result;
use std::sync::Arc;
use text_detector::{api, config::ServerConfig};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DETECTOR_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting text-detector");

    let config = ServerConfig::load()?;
    info!(
        instance = %config.instance_name,
        models_dir = %config.models_dir.display(),
        "Detector configured"
    );

    let state = Arc::new(api::AppState::new(config.clone())?);
    state.logger.log_startup(
        DETECTOR_VERSION,
        &config.models_dir.display().to_string(),
        config.temperature,
    );

    // Missing artifacts do not stop the service; they load lazily once present
    let store = state.store.clone();
    match tokio::task::spawn_blocking(move || store.load_all()).await? {
        Ok(summary) => state.logger.log_load_summary(&summary),
        Err(e) => warn!(error = %e, "Model loading failed, serving until artifacts appear"),
    }
    state.metrics.set_artifacts_loaded(state.store.loaded_count());

    let api_handle = tokio::spawn(api::serve(config.api_port, state.clone()));

    tokio::select! {
        result = api_handle => {
            match result {
                Ok(Ok(())) => info!("API server stopped"),
                Ok(Err(e)) => error!(error = %e, "API server failed"),
                Err(e) => error!(error = %e, "API server task panicked"),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            state.logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
