#![allow(dead_code)]

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use tokio::net::TcpListener;

use quantized_textgen_service::{
    ModelMetadata, ModelRegistry, SamplingParams, ServiceError, TextGenerator, build_router,
    quantization::QuantizationConfig,
};

/// Greedy stand-in that appends one word per token of budget.
#[derive(Default)]
pub struct WordGenerator {
    pub calls: AtomicUsize,
}

impl WordGenerator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextGenerator for WordGenerator {
    fn generate(
        &self,
        prompt: &str,
        max_new_tokens: usize,
        params: &SamplingParams,
    ) -> Result<String, ServiceError> {
        assert!(!params.do_sample, "tests expect greedy decoding");
        self.calls.fetch_add(1, Ordering::SeqCst);
        let continuation: String = (0..max_new_tokens).map(|i| format!(" w{i}")).collect();
        Ok(format!("{prompt}{continuation}"))
    }

    fn metadata(&self) -> ModelMetadata {
        ModelMetadata {
            name: "word-generator".to_string(),
            artifact_path: "memory".to_string(),
            size_bytes: 0,
            device: "Cpu".to_string(),
            eos_token_id: None,
            quantization: QuantizationConfig::default(),
        }
    }
}

pub struct FailingGenerator;

impl TextGenerator for FailingGenerator {
    fn generate(&self, _: &str, _: usize, _: &SamplingParams) -> Result<String, ServiceError> {
        Err(ServiceError::Inference("CUDA out of memory".into()))
    }

    fn metadata(&self) -> ModelMetadata {
        WordGenerator::default().metadata()
    }
}

pub async fn spawn_server(generator: Arc<dyn TextGenerator>) -> SocketAddr {
    let registry = Arc::new(ModelRegistry::with_generator(
        generator,
        SamplingParams::greedy(),
    ));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(registry)).await.unwrap();
    });
    addr
}
