use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("failed to load model: {0}")]
    ModelLoad(String),
    #[error("tokenizer error: {0}")]
    Tokenizer(String),
    #[error("model execution failed: {0}")]
    Inference(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no inference backend compiled in; enable the `tch-backend` feature")]
    BackendUnavailable,
}

impl IntoResponse for ServiceError {
    // Generation faults surface as a bare 500; the cause only goes to the log.
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}

#[derive(Debug, Error)]
pub enum BenchmarkError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("benchmark needs at least one timed request")]
    NoRequests,
}
