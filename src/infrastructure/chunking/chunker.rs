//! Token-window chunker.
//!
//! Splits text into overlapping windows of `chunk_size` tokens at a stride
//! of `chunk_size - chunk_overlap`, then snaps each window edge to a word
//! boundary so no chunk starts or ends mid-word. Offsets are reported in
//! token space against the pre-snap window grid.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{Chunk, ChunkOptions, ChunkingOutcome};
use crate::domain::ports::Chunking;

use super::tokenizer::{TokenId, Tokenizer};

/// Tokens decoded before a window start when completing a leading word.
const START_LOOKBACK_TOKENS: usize = 16;

/// Maximum token-index adjustment when a window cut splits a UTF-8 character.
const MAX_REALIGN: usize = 3;

/// Token-window chunking service.
pub struct Chunker {
    tokenizer: Arc<Tokenizer>,
}

impl Chunker {
    pub fn new(tokenizer: Arc<Tokenizer>) -> Self {
        Self { tokenizer }
    }

    fn chunk_impl(&self, text: &str, options: &ChunkOptions) -> EngineResult<ChunkingOutcome> {
        options.validate().map_err(EngineError::Validation)?;

        if text.trim().is_empty() {
            return Err(EngineError::Validation(
                "cannot chunk empty or whitespace-only text".to_string(),
            ));
        }

        let tokens = self.tokenizer.encode(text);

        // At or under the budget: the whole document is one chunk, unsnapped.
        if tokens.len() <= options.chunk_size {
            let chunk = Chunk {
                text: text.to_string(),
                token_count: tokens.len(),
                start_offset: 0,
            };
            return Ok(ChunkingOutcome {
                chunks: vec![chunk],
                capped: false,
            });
        }

        let stride = options.stride();
        let mut chunks = Vec::new();
        let mut capped = false;
        let mut start = 0;

        loop {
            if chunks.len() == options.max_chunks_per_file {
                capped = true;
                let projected = (tokens.len() - options.chunk_size).div_ceil(stride) + 1;
                warn!(
                    projected_chunks = projected,
                    cap = options.max_chunks_per_file,
                    "document exceeds chunk cap, truncating"
                );
                break;
            }

            let end = (start + options.chunk_size).min(tokens.len());
            let text_chunk = self.render_window(&tokens, start, end)?;
            let token_count = self.tokenizer.count(&text_chunk);

            chunks.push(Chunk {
                text: text_chunk,
                token_count,
                start_offset: start,
            });

            if end >= tokens.len() {
                break;
            }
            start += stride;
        }

        Ok(ChunkingOutcome { chunks, capped })
    }

    /// Decode the window `[start, end)` and snap both edges to word
    /// boundaries: the end pulls back past any dangling word fragment, and
    /// the start extends back to the start of a word the cut split. The
    /// first window never extends; the last never trims.
    fn render_window(&self, tokens: &[TokenId], start: usize, end: usize) -> EngineResult<String> {
        let is_first = start == 0;
        let is_last = end == tokens.len();

        let (decoded, adjusted_start) = self.decode_realigned(tokens, start, end)?;
        let mut text = if is_last {
            decoded
        } else {
            trim_end_to_boundary(&decoded).to_string()
        };

        if !is_first && text.chars().next().is_some_and(|c| !is_boundary(c)) {
            if let Some(prefix) = self.word_prefix_before(tokens, adjusted_start) {
                text.insert_str(0, &prefix);
            }
        }

        Ok(text)
    }

    /// Decode `[start, end)`, nudging the cut points by a few tokens when
    /// the window splits a multi-byte character. Returns the decoded text
    /// and the start index actually used.
    fn decode_realigned(
        &self,
        tokens: &[TokenId],
        start: usize,
        end: usize,
    ) -> EngineResult<(String, usize)> {
        for back in 0..=MAX_REALIGN {
            let e = end.saturating_sub(back);
            if e <= start.saturating_sub(MAX_REALIGN) {
                break;
            }
            for ext in 0..=MAX_REALIGN {
                let s = start.saturating_sub(ext);
                if s >= e {
                    continue;
                }
                if let Ok(text) = self.tokenizer.decode(tokens[s..e].to_vec()) {
                    return Ok((text, s));
                }
            }
        }
        Err(EngineError::Validation(
            "token window is not valid UTF-8 after realignment".to_string(),
        ))
    }

    /// Trailing word fragment of the text just before `start`, used to
    /// complete a word the window cut in half. Empty when the preceding
    /// character is already a boundary.
    fn word_prefix_before(&self, tokens: &[TokenId], start: usize) -> Option<String> {
        if start == 0 {
            return None;
        }
        let lookback = start.saturating_sub(START_LOOKBACK_TOKENS);
        for ext in 0..=MAX_REALIGN {
            let s = lookback.saturating_sub(ext);
            if let Ok(context) = self.tokenizer.decode(tokens[s..start].to_vec()) {
                let tail_rev: String = context
                    .chars()
                    .rev()
                    .take_while(|c| !is_boundary(*c))
                    .collect();
                if tail_rev.is_empty() {
                    return None;
                }
                return Some(tail_rev.chars().rev().collect());
            }
        }
        None
    }
}

/// Word boundaries are whitespace and ASCII punctuation.
fn is_boundary(c: char) -> bool {
    c.is_whitespace() || c.is_ascii_punctuation()
}

/// Cut the text back to just after its last boundary character, dropping a
/// trailing word fragment. Text that already ends on a boundary, or that
/// contains no boundary at all, is returned unchanged.
fn trim_end_to_boundary(text: &str) -> &str {
    match text.chars().last() {
        Some(c) if !is_boundary(c) => text
            .char_indices()
            .rev()
            .find(|(_, c)| is_boundary(*c))
            .map_or(text, |(i, c)| &text[..i + c.len_utf8()]),
        _ => text,
    }
}

#[async_trait]
impl Chunking for Chunker {
    async fn chunk(&self, text: &str, options: &ChunkOptions) -> EngineResult<ChunkingOutcome> {
        self.chunk_impl(text, options)
    }

    async fn count_tokens(&self, text: &str) -> EngineResult<usize> {
        Ok(self.tokenizer.count(text))
    }
}
