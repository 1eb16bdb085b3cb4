use serde::{Deserialize, Serialize};

use crate::quantization::QuantizationConfig;

pub const DEFAULT_MAX_NEW_TOKENS: usize = 100;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: usize,
}

fn default_max_new_tokens() -> usize {
    DEFAULT_MAX_NEW_TOKENS
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationResponse {
    /// Prompt followed by the model continuation.
    pub generated_text: String,
}

/// Decoding knobs shared by every request served by one process.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SamplingParams {
    pub do_sample: bool,
    pub temperature: f64,
    pub top_p: f64,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            do_sample: true,
            temperature: 0.7,
            top_p: 0.9,
        }
    }
}

impl SamplingParams {
    pub fn greedy() -> Self {
        Self {
            do_sample: false,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelMetadata {
    pub name: String,
    pub artifact_path: String,
    pub size_bytes: u64,
    pub device: String,
    pub eos_token_id: Option<u32>,
    pub quantization: QuantizationConfig,
}
