use std::{fs, path::Path};

use parking_lot::Mutex;
use tch::{CModule, Device, IValue, Kind, Tensor, no_grad};
use tracing::info;

use crate::{
    config::AppConfig,
    error::ServiceError,
    model::{
        ModelMetadata, SamplingParams, TextGenerator, pipeline::generate_text,
        tokenizer::PromptCodec,
    },
    quantization::QuantizationConfig,
};

/// TorchScript causal LM plus its tokenizer, loaded once at startup.
pub struct TorchGenerator {
    name: String,
    artifact_path: String,
    size_bytes: u64,
    device: Device,
    quantization: QuantizationConfig,
    codec: PromptCodec,
    module: Mutex<CModule>,
}

impl TorchGenerator {
    pub fn load(config: &AppConfig) -> Result<Self, ServiceError> {
        let codec = PromptCodec::from_file(&config.tokenizer_path, config.eos_token_id)?;

        let module_path = config.module_path.as_path();
        if !module_path.exists() {
            return Err(ServiceError::ModelLoad(format!(
                "model artifact missing: {}",
                module_path.display()
            )));
        }
        let size_bytes = fs::metadata(module_path)?.len();

        let mut module = CModule::load_on_device(module_path, config.device)
            .map_err(|e| ServiceError::ModelLoad(e.to_string()))?;
        module.set_eval();
        if let Some(dtype) = config.quantization.compute_dtype {
            module.to(config.device, dtype.kind(), false);
        }

        let name = artifact_name(&config.model_path);
        info!(
            model = %name,
            device = ?config.device,
            size_bytes,
            eos_token_id = ?codec.eos_token_id(),
            "model artifacts loaded"
        );

        Ok(Self {
            name,
            artifact_path: module_path.display().to_string(),
            size_bytes,
            device: config.device,
            quantization: config.quantization.clone(),
            codec,
            module: Mutex::new(module),
        })
    }

    fn last_position_logits(&self, module: &CModule, sequence: &[i64]) -> Result<Vec<f32>, ServiceError> {
        let input = Tensor::from_slice(sequence)
            .reshape([1, sequence.len() as i64])
            .to(self.device);

        let output = module
            .forward_is(&[IValue::Tensor(input)])
            .map_err(|e| ServiceError::Inference(e.to_string()))?;

        // Traced causal LMs return either bare logits or (logits, past, ...).
        let logits = match output {
            IValue::Tensor(t) => t,
            IValue::Tuple(ref items) if !items.is_empty() => match &items[0] {
                IValue::Tensor(t) => t.shallow_clone(),
                _ => {
                    return Err(ServiceError::Inference(
                        "expected tensor as first tuple element".into(),
                    ));
                }
            },
            _ => {
                return Err(ServiceError::Inference(
                    "unexpected model output format".into(),
                ));
            }
        };

        // [1, seq_len, vocab] -> [vocab]
        let last = logits
            .select(1, -1)
            .squeeze()
            .to_kind(Kind::Float)
            .to(Device::Cpu);
        Vec::<f32>::try_from(&last).map_err(|e| ServiceError::Inference(e.to_string()))
    }
}

impl TextGenerator for TorchGenerator {
    fn generate(
        &self,
        prompt: &str,
        max_new_tokens: usize,
        params: &SamplingParams,
    ) -> Result<String, ServiceError> {
        let module = self.module.lock();
        let mut rng = rand::thread_rng();
        no_grad(|| {
            generate_text(&self.codec, prompt, max_new_tokens, params, &mut rng, |sequence| {
                self.last_position_logits(&module, sequence)
            })
        })
    }

    fn metadata(&self) -> ModelMetadata {
        ModelMetadata {
            name: self.name.clone(),
            artifact_path: self.artifact_path.clone(),
            size_bytes: self.size_bytes,
            device: format!("{:?}", self.device),
            eos_token_id: self.codec.eos_token_id(),
            quantization: self.quantization.clone(),
        }
    }
}

fn artifact_name(model_path: &Path) -> String {
    model_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| model_path.display().to_string())
}
