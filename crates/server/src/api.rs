//! HTTP API: form page, JSON prediction, health, readiness and Prometheus metrics

use crate::config::ServerConfig;
use crate::render;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use detector_lib::{
    health::{ComponentStatus, HealthResponse, ReadinessResponse},
    observability::{DetectorMetrics, StructuredLogger},
    store::{ArtifactLoader, FsArtifactLoader, ModelStore},
    CapabilityTier, DetectorError, EnsemblePredictor, EnsembleResult,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Characters of input echoed in logs and debug output
const PREVIEW_CHARS: usize = 120;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<EnsemblePredictor>,
    pub store: Arc<ModelStore>,
    pub config: ServerConfig,
    pub metrics: DetectorMetrics,
    pub logger: StructuredLogger,
}

impl AppState {
    /// State backed by the artifacts in `config.models_dir`
    pub fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let loader = Arc::new(FsArtifactLoader::new(config.models_dir.clone()));
        Self::with_loader(config, loader)
    }

    pub fn with_loader(config: ServerConfig, loader: Arc<dyn ArtifactLoader>) -> anyhow::Result<Self> {
        let ensemble = config.ensemble_config()?;
        let store = Arc::new(ModelStore::new(loader, ensemble.classifiers.clone()));
        let predictor = Arc::new(EnsemblePredictor::new(store.clone(), ensemble));
        let logger = StructuredLogger::new(config.instance_name.clone());

        Ok(Self {
            predictor,
            store,
            config,
            metrics: DetectorMetrics::new(),
            logger,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PredictForm {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub text: Option<String>,
}

/// Extra detail attached to JSON responses when `debug_api` is on
#[derive(Debug, Serialize)]
pub struct DebugInfo {
    pub input_length: usize,
    pub first_120_chars: String,
    pub model_classes: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    #[serde(flatten)]
    pub result: EnsembleResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugInfo>,
}

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub name: String,
    pub loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capability: Option<CapabilityTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
    pub best_model: String,
    pub temperature: f64,
}

/// Why an input was turned away before reaching the ensemble
#[derive(Debug, Clone, PartialEq, Eq)]
enum Rejection {
    Empty,
    TooShort(usize),
}

impl Rejection {
    fn reason(&self) -> &'static str {
        match self {
            Rejection::Empty => "empty",
            Rejection::TooShort(_) => "too_short",
        }
    }

    fn message(&self) -> String {
        match self {
            Rejection::Empty => "Please enter some text.".to_string(),
            Rejection::TooShort(min) => format!("Text must be at least {} characters.", min),
        }
    }
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

/// Trim and length-check an input; rejections are counted and logged
fn validate(state: &AppState, raw: &str) -> Result<String, Rejection> {
    let text = raw.trim();
    let length = text.chars().count();

    let rejection = if text.is_empty() {
        Some(Rejection::Empty)
    } else if length < state.config.min_text_chars {
        Some(Rejection::TooShort(state.config.min_text_chars))
    } else {
        None
    };

    match rejection {
        Some(rejection) => {
            state.metrics.inc_rejected(rejection.reason());
            state.logger.log_rejected_input(rejection.reason(), length);
            Err(rejection)
        }
        None => Ok(text.to_string()),
    }
}

/// Run the ensemble off the async workers
async fn run_ensemble(state: &AppState, text: String) -> Result<(EnsembleResult, Option<DebugInfo>), String> {
    state.logger.log_request(&text);
    let started = Instant::now();

    let predictor = state.predictor.clone();
    let debug_api = state.config.debug_api;
    let joined = tokio::task::spawn_blocking(move || {
        let result = predictor.predict_all(&text)?;
        let debug = debug_api.then(|| debug_info(&predictor, &text));
        Ok::<_, DetectorError>((result, debug))
    })
    .await;

    match joined {
        Ok(Ok((result, debug))) => {
            state
                .logger
                .log_verdict(&result, started.elapsed().as_secs_f64());
            Ok((result, debug))
        }
        Ok(Err(e)) => {
            error!(error = %e, "Prediction failed");
            Err(e.to_string())
        }
        Err(e) => {
            error!(error = %e, "Prediction task aborted");
            Err("prediction task aborted".to_string())
        }
    }
}

fn debug_info(predictor: &EnsemblePredictor, text: &str) -> DebugInfo {
    let store = predictor.store();
    let model_classes = predictor
        .config()
        .classifiers
        .iter()
        .filter_map(|name| {
            store
                .classifier_labels(name)
                .ok()
                .map(|labels| (name.clone(), labels))
        })
        .collect();

    DebugInfo {
        input_length: text.chars().count(),
        first_120_chars: preview(text),
        model_classes,
    }
}

/// Form page
async fn index() -> Html<String> {
    Html(render::page("", None, None))
}

/// Form submission; renders the result or the error on the same page
async fn predict_form(State(state): State<Arc<AppState>>, Form(form): Form<PredictForm>) -> Response {
    let text = match validate(&state, &form.text) {
        Ok(text) => text,
        Err(rejection) => {
            let echoed = match rejection {
                Rejection::Empty => "",
                Rejection::TooShort(_) => form.text.trim(),
            };
            return (
                StatusCode::BAD_REQUEST,
                Html(render::page(echoed, None, Some(&rejection.message()))),
            )
                .into_response();
        }
    };

    match run_ensemble(&state, text.clone()).await {
        Ok((result, _)) => Html(render::page(&text, Some(&result), None)).into_response(),
        Err(message) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(render::page(
                &text,
                None,
                Some(&format!("Prediction failed: {}", message)),
            )),
        )
            .into_response(),
    }
}

fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// JSON prediction endpoint
async fn api_predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Response {
    let raw = match payload {
        Ok(Json(PredictRequest { text: Some(text) })) => text,
        Ok(Json(PredictRequest { text: None })) | Err(_) => {
            state.metrics.inc_rejected("malformed");
            return json_error(StatusCode::BAD_REQUEST, "JSON body must contain a 'text' field");
        }
    };

    let text = match validate(&state, &raw) {
        Ok(text) => text,
        Err(rejection) => return json_error(StatusCode::BAD_REQUEST, rejection.message()),
    };

    match run_ensemble(&state, text).await {
        Ok((result, debug)) => Json(PredictResponse { result, debug }).into_response(),
        Err(message) => json_error(StatusCode::INTERNAL_SERVER_ERROR, message),
    }
}

/// Liveness probe: always 200, reports whether the models are loaded
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "models_loaded": state.store.is_ready(),
    }))
}

/// Component health - returns 200 if healthy or degraded, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = HealthResponse::from_store(&state.store);

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still answering
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = ReadinessResponse::from_store(&state.store);

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Configured classifiers and what the store knows about them; never triggers a load
async fn models(State(state): State<Arc<AppState>>) -> Json<ModelsResponse> {
    let models = state
        .store
        .classifier_names()
        .iter()
        .map(|name| {
            let cached = if state.store.is_classifier_loaded(name) {
                state.store.classifier(name).ok()
            } else {
                None
            };
            ModelInfo {
                name: name.clone(),
                loaded: cached.is_some(),
                capability: cached.as_ref().map(|c| c.capability_tier()),
                labels: cached.as_ref().map(|c| c.labels().to_vec()),
            }
        })
        .collect();

    let config = state.predictor.config();
    Json(ModelsResponse {
        models,
        best_model: config.best_model.clone(),
        temperature: config.temperature.value(),
    })
}

/// Prometheus metrics endpoint
async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    state.metrics.set_artifacts_loaded(state.store.loaded_count());

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/predict", post(predict_form))
        .route("/api/predict", post(api_predict))
        .route("/api/models", get(models))
        .route("/health", get(health))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
