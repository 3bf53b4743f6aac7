//! Chunking domain models
//!
//! A chunk is the atomic unit this engine stores and embeds: a token-bounded
//! slice of a source file. Chunks overlap so a concept spanning a boundary is
//! still fully embeddable from at least one chunk.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Configuration for document chunking
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChunkOptions {
    /// Maximum size of each chunk in tokens
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in tokens
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Hard cap on chunks produced for a single file; exceeding it truncates
    /// the sequence with a warning rather than failing ingestion
    #[serde(default = "default_max_chunks_per_file")]
    pub max_chunks_per_file: usize,
}

const fn default_chunk_size() -> usize {
    512
}

const fn default_chunk_overlap() -> usize {
    128
}

const fn default_max_chunks_per_file() -> usize {
    200
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            max_chunks_per_file: default_max_chunks_per_file(),
        }
    }
}

impl ChunkOptions {
    /// Token stride between consecutive window starts.
    pub const fn stride(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be greater than 0".to_string());
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err("chunk_overlap must be less than chunk_size".to_string());
        }
        if self.max_chunks_per_file == 0 {
            return Err("max_chunks_per_file must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// A chunk of text produced by the chunker, before embedding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// The text content of this chunk, snapped to word boundaries
    pub text: String,

    /// Number of tokens in the snapped text
    pub token_count: usize,

    /// Token offset of this chunk's window within the source document
    pub start_offset: usize,
}

/// The full result of chunking one document
#[derive(Debug, Clone)]
pub struct ChunkingOutcome {
    /// Ordered chunks, at most `max_chunks_per_file` of them
    pub chunks: Vec<Chunk>,

    /// True when the document produced more windows than the cap allowed;
    /// a capped file is still a successful ingestion
    pub capped: bool,
}

impl ChunkingOutcome {
    pub fn total_chunks(&self) -> usize {
        self.chunks.len()
    }
}

/// One persisted row: a chunk of a file together with its embedding.
///
/// `(repo_url, file_path, chunk_index)` is the upsert key; `total_chunks`
/// is identical across every row of the same file at rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub repo_url: String,
    pub file_path: String,
    pub chunk_index: i64,
    pub total_chunks: i64,
    pub title: String,
    pub text: String,
    pub token_count: i64,
    pub file_type: String,
    pub is_code: bool,
    pub is_implementation: bool,
    pub embedding: Vec<f32>,
    pub metadata_json: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChunkRecord {
    /// Source-file identity this row belongs to.
    pub fn file_identity(&self) -> (String, String) {
        (self.repo_url.clone(), self.file_path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_match_documented_values() {
        let opts = ChunkOptions::default();
        assert_eq!(opts.chunk_size, 512);
        assert_eq!(opts.chunk_overlap, 128);
        assert_eq!(opts.max_chunks_per_file, 200);
        assert_eq!(opts.stride(), 384);
    }

    #[test]
    fn validate_rejects_overlap_at_or_above_size() {
        let opts = ChunkOptions {
            chunk_size: 100,
            chunk_overlap: 100,
            max_chunks_per_file: 10,
        };
        assert!(opts.validate().is_err());

        let opts = ChunkOptions {
            chunk_size: 100,
            chunk_overlap: 150,
            max_chunks_per_file: 10,
        };
        assert!(opts.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_sizes() {
        let opts = ChunkOptions {
            chunk_size: 0,
            chunk_overlap: 0,
            max_chunks_per_file: 10,
        };
        assert!(opts.validate().is_err());

        let opts = ChunkOptions {
            chunk_size: 10,
            chunk_overlap: 2,
            max_chunks_per_file: 0,
        };
        assert!(opts.validate().is_err());
    }
}
