//! Token counting for the cl100k model family.

use tiktoken_rs::CoreBPE;

use crate::domain::errors::{EngineError, EngineResult};

/// Token id in the cl100k vocabulary.
pub type TokenId = u32;

/// Tokenizer for token-budget accounting and window decoding.
///
/// Wraps the cl100k_base encoding used by the supported embedding models.
/// Counting is pure CPU work; share one instance behind an `Arc`.
pub struct Tokenizer {
    bpe: CoreBPE,
}

impl Tokenizer {
    pub fn new() -> EngineResult<Self> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| EngineError::Configuration(format!("failed to load tokenizer: {e}")))?;
        Ok(Self { bpe })
    }

    /// Number of tokens in `text`.
    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }

    /// Encode `text` into token ids.
    pub fn encode(&self, text: &str) -> Vec<TokenId> {
        self.bpe.encode_with_special_tokens(text)
    }

    /// Decode token ids back into text.
    ///
    /// Fails when the token sequence does not form valid UTF-8, which can
    /// happen for windows cut mid-character; callers realign the window.
    pub fn decode(&self, tokens: Vec<TokenId>) -> EngineResult<String> {
        self.bpe
            .decode(tokens)
            .map_err(|e| EngineError::Validation(format!("failed to decode tokens: {e}")))
    }
}

impl std::fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tokenizer").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_simple_text() {
        let tokenizer = Tokenizer::new().unwrap();
        let count = tokenizer.count("Hello world");
        assert!(count >= 2);
    }

    #[test]
    fn empty_text_has_zero_tokens() {
        let tokenizer = Tokenizer::new().unwrap();
        assert_eq!(tokenizer.count(""), 0);
    }

    #[test]
    fn encode_decode_round_trips() {
        let tokenizer = Tokenizer::new().unwrap();
        let text = "The quick brown fox jumps over the lazy dog.";
        let tokens = tokenizer.encode(text);
        let decoded = tokenizer.decode(tokens).unwrap();
        assert_eq!(decoded, text);
    }

    #[test]
    fn count_matches_encode_length() {
        let tokenizer = Tokenizer::new().unwrap();
        let text = "fn main() { println!(\"hello\"); }";
        assert_eq!(tokenizer.count(text), tokenizer.encode(text).len());
    }
}
