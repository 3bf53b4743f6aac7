//! Retrieval domain models

use serde::{Deserialize, Serialize};

use super::chunk::ChunkRecord;

/// Pattern filters applied to a similarity query.
///
/// Patterns use SQL LIKE syntax (`%` wildcard); a filter that matches
/// nothing yields an empty result, not an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryFilters {
    /// Exact repository match
    pub repo_url: Option<String>,

    /// LIKE pattern over `file_path`, e.g. `%.rs` or `src/%`
    pub path_pattern: Option<String>,

    /// LIKE pattern over the serialized metadata bag
    pub metadata_pattern: Option<String>,
}

impl QueryFilters {
    pub fn for_repo(repo_url: impl Into<String>) -> Self {
        Self {
            repo_url: Some(repo_url.into()),
            ..Self::default()
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.repo_url.is_none() && self.path_pattern.is_none() && self.metadata_pattern.is_none()
    }
}

/// One similarity hit: a stored chunk plus its cosine similarity to the query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    /// Store-assigned row id
    pub id: i64,

    pub record: ChunkRecord,

    /// Cosine similarity in [-1, 1]; higher is closer
    pub score: f32,
}

impl ScoredChunk {
    /// Identity of the source file this hit belongs to.
    pub fn file_key(&self) -> (String, String) {
        self.record.file_identity()
    }
}
