pub mod benchmark;
pub mod config;
pub mod error;
pub mod model;
pub mod quantization;
pub mod server;
pub mod telemetry;

pub use benchmark::{BenchmarkConfig, BenchmarkReport, BenchmarkSample, run_benchmark};
pub use config::AppConfig;
pub use error::{BenchmarkError, ServiceError};
pub use model::{
    GenerationRequest, GenerationResponse, ModelMetadata, ModelRegistry, SamplingParams,
    TextGenerator,
};
pub use server::{ROOT_MESSAGE, build_router};
