use std::{fmt, str::FromStr};

use serde::Serialize;

/// Floating-point type the inference library computes in after load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeDtype {
    BFloat16,
    Float16,
    Float32,
}

impl FromStr for ComputeDtype {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "bfloat16" | "bf16" => Ok(Self::BFloat16),
            "float16" | "fp16" | "f16" | "half" => Ok(Self::Float16),
            "float32" | "fp32" | "f32" | "float" => Ok(Self::Float32),
            other => Err(format!("unknown compute dtype '{other}'")),
        }
    }
}

impl fmt::Display for ComputeDtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BFloat16 => "bfloat16",
            Self::Float16 => "float16",
            Self::Float32 => "float32",
        };
        f.write_str(name)
    }
}

#[cfg(feature = "tch-backend")]
impl ComputeDtype {
    pub fn kind(self) -> tch::Kind {
        match self {
            Self::BFloat16 => tch::Kind::BFloat16,
            Self::Float16 => tch::Kind::Half,
            Self::Float32 => tch::Kind::Float,
        }
    }
}

/// How the artifact on disk was quantized. Only `compute_dtype` is acted on;
/// the rest is reported as-is through `/metadata`. `None` keeps the exported
/// parameter types.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuantizationConfig {
    pub scheme: String,
    pub double_quant: bool,
    pub compute_dtype: Option<ComputeDtype>,
}

impl Default for QuantizationConfig {
    fn default() -> Self {
        Self {
            scheme: "nf4".to_string(),
            double_quant: true,
            compute_dtype: Some(ComputeDtype::BFloat16),
        }
    }
}
