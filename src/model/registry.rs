use std::{sync::Arc, time::Instant};

use tokio::task;
use tracing::info;

use crate::{
    config::AppConfig,
    error::ServiceError,
    model::{GenerationRequest, GenerationResponse, ModelMetadata, SamplingParams, TextGenerator},
};

/// Process-wide handle to the one loaded model and the decoding settings every
/// request uses.
pub struct ModelRegistry {
    generator: Arc<dyn TextGenerator>,
    sampling: SamplingParams,
}

impl ModelRegistry {
    #[cfg(feature = "tch-backend")]
    pub fn initialize(config: &AppConfig) -> Result<Self, ServiceError> {
        let generator = crate::model::TorchGenerator::load(config)?;
        Ok(Self::with_generator(
            Arc::new(generator),
            config.sampling.clone(),
        ))
    }

    #[cfg(not(feature = "tch-backend"))]
    pub fn initialize(_config: &AppConfig) -> Result<Self, ServiceError> {
        Err(ServiceError::BackendUnavailable)
    }

    pub fn with_generator(generator: Arc<dyn TextGenerator>, sampling: SamplingParams) -> Self {
        Self {
            generator,
            sampling,
        }
    }

    pub fn metadata(&self) -> ModelMetadata {
        self.generator.metadata()
    }

    pub fn sampling(&self) -> &SamplingParams {
        &self.sampling
    }

    pub async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, ServiceError> {
        let generator = self.generator.clone();
        let params = self.sampling.clone();
        let GenerationRequest {
            prompt,
            max_new_tokens,
        } = request;

        let start = Instant::now();
        let generated_text = task::spawn_blocking(move || {
            generator.generate(&prompt, max_new_tokens, &params)
        })
        .await
        .map_err(|err| ServiceError::Inference(format!("inference task failed: {err}")))??;

        info!(
            max_new_tokens,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "generation complete"
        );

        Ok(GenerationResponse { generated_text })
    }
}
