use std::{
    env,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
};

use anyhow::Context;
#[cfg(feature = "tch-backend")]
use tch::Device;

use crate::{
    model::SamplingParams,
    quantization::{ComputeDtype, QuantizationConfig},
};

const DEFAULT_MODEL_PATH: &str = "./Quantized_Airavata";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub model_path: PathBuf,
    pub module_path: PathBuf,
    pub tokenizer_path: PathBuf,
    pub eos_token_id: Option<u32>,
    pub device_spec: String,
    pub sampling: SamplingParams,
    pub quantization: QuantizationConfig,
    #[cfg(feature = "tch-backend")]
    pub device: Device,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key/value source. Numeric knobs fall back to
    /// their defaults on parse errors; an unknown compute dtype is rejected and
    /// `COMPUTE_DTYPE=none` keeps the exported parameter types.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let listen_addr = lookup("SERVER_ADDR")
            .unwrap_or_else(|| "127.0.0.1:8000".into())
            .parse()
            .unwrap_or_else(|_| SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8000));

        let model_path =
            PathBuf::from(lookup("MODEL_PATH").unwrap_or_else(|| DEFAULT_MODEL_PATH.to_string()));
        let module_path = lookup("MODULE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| model_path.join("model.ts"));
        let tokenizer_path = lookup("TOKENIZER_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| model_path.join("tokenizer.json"));

        let eos_token_id = lookup("EOS_TOKEN_ID").and_then(|v| v.parse().ok());

        let defaults = SamplingParams::default();
        let sampling = SamplingParams {
            do_sample: lookup("DO_SAMPLE")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.do_sample),
            temperature: lookup("TEMPERATURE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.temperature),
            top_p: lookup("TOP_P")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.top_p),
        };

        let quant_defaults = QuantizationConfig::default();
        let compute_dtype = match lookup("COMPUTE_DTYPE") {
            None => quant_defaults.compute_dtype,
            Some(raw) if raw.trim().eq_ignore_ascii_case("none") => None,
            Some(raw) => Some(
                raw.parse::<ComputeDtype>()
                    .map_err(anyhow::Error::msg)
                    .context("invalid COMPUTE_DTYPE")?,
            ),
        };
        let quantization = QuantizationConfig {
            scheme: lookup("QUANT_SCHEME").unwrap_or(quant_defaults.scheme),
            double_quant: lookup("QUANT_DOUBLE")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(quant_defaults.double_quant),
            compute_dtype,
        };

        let device_spec = lookup("DEVICE").unwrap_or_else(|| "auto".into());
        #[cfg(feature = "tch-backend")]
        let device = parse_device(&device_spec);

        Ok(Self {
            listen_addr,
            model_path,
            module_path,
            tokenizer_path,
            eos_token_id,
            device_spec,
            sampling,
            quantization,
            #[cfg(feature = "tch-backend")]
            device,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(feature = "tch-backend")]
fn parse_device(raw: &str) -> Device {
    let lower = raw.to_lowercase();
    if lower == "auto" {
        Device::cuda_if_available()
    } else if lower.starts_with("cuda") {
        let idx = lower
            .split(':')
            .nth(1)
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(0);
        if tch::Cuda::is_available() {
            Device::Cuda(idx)
        } else {
            Device::Cpu
        }
    } else {
        Device::Cpu
    }
}
