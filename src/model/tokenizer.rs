use std::path::Path;

use tokenizers::Tokenizer;

use crate::error::ServiceError;

const EOS_CANDIDATES: [&str; 3] = ["</s>", "<|endoftext|>", "<|eot_id|>"];

/// Tokenizer plus the end-of-sequence id the decode loop stops on.
pub struct PromptCodec {
    tokenizer: Tokenizer,
    eos_token_id: Option<u32>,
}

impl PromptCodec {
    pub fn from_file(path: &Path, eos_override: Option<u32>) -> Result<Self, ServiceError> {
        if !path.exists() {
            return Err(ServiceError::ModelLoad(format!(
                "tokenizer missing: {}",
                path.display()
            )));
        }
        let tokenizer =
            Tokenizer::from_file(path).map_err(|e| ServiceError::Tokenizer(e.to_string()))?;
        Ok(Self::new(tokenizer, eos_override))
    }

    pub fn new(tokenizer: Tokenizer, eos_override: Option<u32>) -> Self {
        let eos_token_id = eos_override.or_else(|| {
            EOS_CANDIDATES
                .iter()
                .find_map(|token| tokenizer.token_to_id(token))
        });
        Self {
            tokenizer,
            eos_token_id,
        }
    }

    pub fn eos_token_id(&self) -> Option<u32> {
        self.eos_token_id
    }

    pub fn encode(&self, prompt: &str) -> Result<Vec<i64>, ServiceError> {
        let encoding = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| ServiceError::Tokenizer(e.to_string()))?;
        Ok(encoding.get_ids().iter().map(|&id| id as i64).collect())
    }

    pub fn decode(&self, ids: &[i64]) -> Result<String, ServiceError> {
        let ids: Vec<u32> = ids.iter().map(|&id| id as u32).collect();
        self.tokenizer
            .decode(&ids, true)
            .map_err(|e| ServiceError::Tokenizer(e.to_string()))
    }

    /// Text the new tokens add after the prompt.
    ///
    /// Decodes prompt and continuation together and cuts off the decoded
    /// prompt, so word-boundary markers that only resolve in context come out
    /// right.
    pub fn continuation(&self, prompt_ids: &[i64], new_ids: &[i64]) -> Result<String, ServiceError> {
        if new_ids.is_empty() {
            return Ok(String::new());
        }
        let prefix = self.decode(prompt_ids)?;
        let full_ids: Vec<i64> = prompt_ids.iter().chain(new_ids).copied().collect();
        let full = self.decode(&full_ids)?;
        match full.get(prefix.len()..) {
            Some(tail) if full.starts_with(&prefix) => Ok(tail.to_string()),
            _ => self.decode(new_ids),
        }
    }
}

/// Word-level tokenizer without a pre-tokenizer; each word's id is its index.
#[cfg(test)]
pub(crate) fn word_level_tokenizer(words: &[&str]) -> Tokenizer {
    use std::collections::HashMap;

    use tokenizers::models::wordlevel::WordLevel;

    let vocab: HashMap<String, u32> = words
        .iter()
        .enumerate()
        .map(|(idx, word)| (word.to_string(), idx as u32))
        .collect();
    let model = WordLevel::builder()
        .vocab(vocab)
        .unk_token("<unk>".to_string())
        .build()
        .unwrap();
    Tokenizer::new(model)
}
