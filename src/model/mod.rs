mod generator;
#[cfg(feature = "tch-backend")]
mod loader;
pub mod pipeline;
mod registry;
pub mod sampling;
pub mod tokenizer;
mod types;

pub use generator::TextGenerator;
#[cfg(feature = "tch-backend")]
pub use loader::TorchGenerator;
pub use registry::ModelRegistry;
pub use tokenizer::PromptCodec;
pub use types::{
    DEFAULT_MAX_NEW_TOKENS, GenerationRequest, GenerationResponse, ModelMetadata, SamplingParams,
};
