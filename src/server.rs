use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::{
    error::ServiceError,
    model::{GenerationRequest, GenerationResponse, ModelMetadata, ModelRegistry, SamplingParams},
};

pub const ROOT_MESSAGE: &str = "✅ Airavata FastAPI server is running. Visit /metadata to try the API.";

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ModelRegistry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
}

#[derive(Serialize)]
struct MetadataResponse {
    model: ModelMetadata,
    sampling: SamplingParams,
}

pub fn build_router(registry: Arc<ModelRegistry>) -> Router {
    let state = AppState { registry };

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/generate", post(generate))
        .route("/metadata", get(metadata))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: ROOT_MESSAGE.to_string(),
    })
}

async fn health() -> &'static str {
    "ok"
}

async fn generate(
    State(state): State<AppState>,
    Json(request): Json<GenerationRequest>,
) -> Result<Json<GenerationResponse>, ServiceError> {
    let response = state.registry.generate(request).await?;
    Ok(Json(response))
}

async fn metadata(State(state): State<AppState>) -> Json<MetadataResponse> {
    Json(MetadataResponse {
        model: state.registry.metadata(),
        sampling: state.registry.sampling().clone(),
    })
}
