//! Next-token selection and the autoregressive decode loop.
//!
//! Everything here works on plain logit slices so the forward pass can come
//! from any backend.

use std::cmp::Ordering;

use rand::Rng;

use crate::{error::ServiceError, model::SamplingParams};

/// Picks the next token id from last-position logits.
///
/// Greedy when sampling is disabled or the temperature is not positive,
/// otherwise temperature-scaled nucleus sampling. Returns `None` for empty or
/// fully masked logits.
pub fn select_next_token<R>(logits: &[f32], params: &SamplingParams, rng: &mut R) -> Option<usize>
where
    R: Rng + ?Sized,
{
    let sampling = params.do_sample && params.temperature.is_finite() && params.temperature > 0.0;
    if !sampling {
        return argmax(logits);
    }

    let nucleus = nucleus_probabilities(logits, params.temperature, params.top_p);
    if nucleus.is_empty() {
        return argmax(logits);
    }

    let target = rng.r#gen::<f64>();
    let mut cumulative = 0.0;
    for &(idx, prob) in &nucleus {
        cumulative += prob;
        if cumulative > target {
            return Some(idx);
        }
    }
    nucleus.last().map(|&(idx, _)| idx)
}

/// Smallest highest-probability token set whose mass reaches `top_p`,
/// renormalized and sorted by descending probability. Always keeps at least
/// one token when the distribution is well formed.
pub fn nucleus_probabilities(logits: &[f32], temperature: f64, top_p: f64) -> Vec<(usize, f64)> {
    let scaled: Vec<f64> = logits.iter().map(|&l| l as f64 / temperature).collect();
    let max = scaled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return Vec::new();
    }

    let mut probs: Vec<(usize, f64)> = scaled
        .iter()
        .enumerate()
        .map(|(idx, &s)| (idx, (s - max).exp()))
        .collect();
    let total: f64 = probs.iter().map(|(_, p)| p).sum();
    if !(total.is_finite() && total > 0.0) {
        return Vec::new();
    }
    for (_, p) in probs.iter_mut() {
        *p /= total;
    }
    probs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    let mut cumulative = 0.0;
    let mut keep = 0;
    for (_, p) in &probs {
        cumulative += p;
        keep += 1;
        if cumulative >= top_p {
            break;
        }
    }
    probs.truncate(keep.max(1));

    let kept: f64 = probs.iter().map(|(_, p)| p).sum();
    for (_, p) in probs.iter_mut() {
        *p /= kept;
    }
    probs
}

fn argmax(logits: &[f32]) -> Option<usize> {
    logits
        .iter()
        .enumerate()
        .filter(|(_, l)| !l.is_nan())
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(Ordering::Equal))
        .map(|(idx, _)| idx)
}

/// Runs the decode loop and returns only the newly generated ids.
///
/// `next_logits` receives the full sequence so far and must return the logits
/// for the position after it. Stops after `max_new_tokens` tokens or when
/// `eos_token_id` is produced; the EOS token itself is not returned.
pub fn decode_tokens<R, F>(
    prompt_ids: &[i64],
    max_new_tokens: usize,
    eos_token_id: Option<i64>,
    params: &SamplingParams,
    rng: &mut R,
    mut next_logits: F,
) -> Result<Vec<i64>, ServiceError>
where
    R: Rng + ?Sized,
    F: FnMut(&[i64]) -> Result<Vec<f32>, ServiceError>,
{
    let mut sequence = prompt_ids.to_vec();
    // The budget comes straight from the request; let the vector grow.
    let mut generated = Vec::new();

    for _ in 0..max_new_tokens {
        let logits = next_logits(&sequence)?;
        let next = select_next_token(&logits, params, rng)
            .ok_or_else(|| ServiceError::Inference("model produced no usable logits".into()))?
            as i64;
        if eos_token_id == Some(next) {
            break;
        }
        sequence.push(next);
        generated.push(next);
    }

    Ok(generated)
}
