use std::time::Instant;

use rand::Rng;
use tracing::debug;

use crate::{
    error::ServiceError,
    model::{SamplingParams, sampling::decode_tokens, tokenizer::PromptCodec},
};

/// Encodes `prompt`, decodes up to `max_new_tokens` tokens with logits from
/// `next_logits`, and returns the prompt followed by the continuation text.
pub fn generate_text<R, F>(
    codec: &PromptCodec,
    prompt: &str,
    max_new_tokens: usize,
    params: &SamplingParams,
    rng: &mut R,
    next_logits: F,
) -> Result<String, ServiceError>
where
    R: Rng + ?Sized,
    F: FnMut(&[i64]) -> Result<Vec<f32>, ServiceError>,
{
    let prompt_ids = codec.encode(prompt)?;
    if prompt_ids.is_empty() {
        return Err(ServiceError::Inference(
            "prompt encoded to zero tokens".into(),
        ));
    }
    let eos = codec.eos_token_id().map(i64::from);

    let start = Instant::now();
    let new_ids = decode_tokens(&prompt_ids, max_new_tokens, eos, params, rng, next_logits)?;
    let continuation = codec.continuation(&prompt_ids, &new_ids)?;
    debug!(
        prompt_tokens = prompt_ids.len(),
        new_tokens = new_ids.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "decode finished"
    );

    Ok(format!("{prompt}{continuation}"))
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::model::tokenizer::word_level_tokenizer;

    const VOCAB: [&str; 4] = ["<unk>", "hello", "world", "</s>"];

    fn codec() -> PromptCodec {
        PromptCodec::new(word_level_tokenizer(&VOCAB), None)
    }

    fn one_hot(id: usize) -> Vec<f32> {
        let mut logits = vec![0.0; VOCAB.len()];
        logits[id] = 1.0;
        logits
    }

    #[test]
    fn prompt_is_kept_as_prefix() {
        let mut rng = StdRng::seed_from_u64(0);
        let text = generate_text(&codec(), "hello", 2, &SamplingParams::greedy(), &mut rng, |_| {
            Ok(one_hot(2))
        })
        .unwrap();
        assert_eq!(text, "hello world world");
    }

    #[test]
    fn continuation_never_exceeds_budget() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut calls = 0;
        let text = generate_text(&codec(), "hello", 3, &SamplingParams::greedy(), &mut rng, |_| {
            calls += 1;
            Ok(one_hot(2))
        })
        .unwrap();
        assert_eq!(calls, 3);
        assert!(text.starts_with("hello"));
        assert_eq!(text["hello".len()..].split_whitespace().count(), 3);
    }

    #[test]
    fn eos_is_stripped_from_output() {
        let mut rng = StdRng::seed_from_u64(0);
        let script = [2usize, 3, 2];
        let text = generate_text(&codec(), "hello", 10, &SamplingParams::greedy(), &mut rng, |seq| {
            Ok(one_hot(script[seq.len() - 1]))
        })
        .unwrap();
        assert_eq!(text, "hello world");
        assert!(!text.contains("</s>"));
    }

    #[test]
    fn zero_budget_returns_prompt_unchanged() {
        let mut rng = StdRng::seed_from_u64(0);
        let text = generate_text(&codec(), "hello", 0, &SamplingParams::greedy(), &mut rng, |_| {
            Err(ServiceError::Inference("model must not run".into()))
        })
        .unwrap();
        assert_eq!(text, "hello");
    }

    #[test]
    fn forward_failure_surfaces_as_inference_error() {
        let mut rng = StdRng::seed_from_u64(0);
        let result = generate_text(&codec(), "hello", 4, &SamplingParams::greedy(), &mut rng, |_| {
            Err(ServiceError::Inference("index out of range in self".into()))
        });
        assert!(matches!(result, Err(ServiceError::Inference(_))));
    }
}
