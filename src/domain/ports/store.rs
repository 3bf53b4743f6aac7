//! Vector store port: persistence and similarity search over chunk rows.

use async_trait::async_trait;

use crate::domain::errors::EngineResult;
use crate::domain::models::{ChunkRecord, QueryFilters, ScoredChunk};

/// Repository interface for chunk persistence and nearest-neighbor search.
///
/// One row per chunk, keyed on `(repo_url, file_path, chunk_index)`.
/// Implementations own dimension validation on every write and the choice of
/// index engine (native vector index or in-process scan).
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Similarity search ordered by descending cosine similarity.
    ///
    /// # Arguments
    /// * `embedding` - The query vector; must match the configured dimension
    /// * `k` - Maximum number of chunk hits to return
    /// * `filters` - Pattern filters; an unmatched filter yields `Ok(vec![])`
    async fn query(
        &self,
        embedding: &[f32],
        k: usize,
        filters: &QueryFilters,
    ) -> EngineResult<Vec<ScoredChunk>>;

    /// Insert-or-update one chunk row on its `(repo_url, file_path,
    /// chunk_index)` key.
    ///
    /// Rejects vectors whose length differs from the configured dimension
    /// with a validation error; nothing is written on rejection.
    async fn upsert(&self, record: &ChunkRecord) -> EngineResult<i64>;

    /// Replace every row of one file with `records`, atomically.
    ///
    /// Deletes all existing rows for `(repo_url, file_path)` and upserts the
    /// new set inside a single transaction, so re-ingestion never leaves
    /// stale higher-indexed rows and concurrent re-ingestions of one file
    /// serialize on the storage engine.
    async fn replace_file_chunks(
        &self,
        repo_url: &str,
        file_path: &str,
        records: &[ChunkRecord],
    ) -> EngineResult<usize>;

    /// Remove every row belonging to one file.
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of rows removed
    async fn delete_chunks(&self, repo_url: &str, file_path: &str) -> EngineResult<usize>;

    /// Remove a single row by its store-assigned id.
    async fn delete(&self, id: i64) -> EngineResult<()>;

    /// Rebuild the nearest-neighbor index from the chunk rows.
    ///
    /// Best-effort: transient index-engine failures are logged and do not
    /// fail the caller.
    async fn rebuild_index(&self) -> EngineResult<()>;

    /// Number of rows stored for one file.
    async fn file_chunk_count(&self, repo_url: &str, file_path: &str) -> EngineResult<usize>;

    /// Every distinct `(repo_url, file_path)` with its row count.
    async fn list_files(&self, repo_url: Option<&str>) -> EngineResult<Vec<(String, String, usize)>>;

    /// Total chunk rows in the store.
    async fn count_chunks(&self) -> EngineResult<usize>;
}
