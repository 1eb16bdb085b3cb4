use crate::{
    error::ServiceError,
    model::{ModelMetadata, SamplingParams},
};

/// A loaded model able to continue a prompt.
///
/// Implementations block for the whole decode; callers are expected to run
/// them off the async runtime.
pub trait TextGenerator: Send + Sync {
    /// Returns the prompt followed by at most `max_new_tokens` tokens of
    /// continuation.
    fn generate(
        &self,
        prompt: &str,
        max_new_tokens: usize,
        params: &SamplingParams,
    ) -> Result<String, ServiceError>;

    fn metadata(&self) -> ModelMetadata;
}
