//! Text chunking port.

use async_trait::async_trait;

use crate::domain::errors::EngineResult;
use crate::domain::models::{ChunkOptions, ChunkingOutcome};

/// Service interface for splitting documents into embeddable chunks.
///
/// Implementations are pure CPU work with no shared mutable state and are
/// safe to call from any number of concurrent workers.
#[async_trait]
pub trait Chunking: Send + Sync {
    /// Split `text` into ordered, overlapping, word-boundary-respecting
    /// chunks under the token budget in `options`.
    ///
    /// A document at or under `chunk_size` tokens yields exactly one chunk.
    /// Exceeding `max_chunks_per_file` truncates the sequence and sets the
    /// outcome's `capped` flag; it is not an error.
    async fn chunk(&self, text: &str, options: &ChunkOptions) -> EngineResult<ChunkingOutcome>;

    /// Token count of `text` under the engine's tokenizer.
    async fn count_tokens(&self, text: &str) -> EngineResult<usize>;
}
