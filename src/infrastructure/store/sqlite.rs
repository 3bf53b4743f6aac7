//! SQLite-backed chunk store
//!
//! Persists chunk rows with their embeddings and serves cosine similarity
//! queries. Uses the sqlite-vec extension for accelerated distance
//! computation when available, with a pure-Rust scan as fallback.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::Row;
use std::time::Duration;

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{ChunkRecord, QueryFilters, ScoredChunk, StoreConfig};
use crate::domain::ports::ChunkStore;

use super::extensions;

/// Distance engine selected at connection time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorBackend {
    /// sqlite-vec `vec_distance_cosine()`, SIMD-accelerated
    NativeVec,
    /// Pure-Rust cosine scan over the candidate rows
    InProcess,
}

/// Chunk store over a SQLite pool.
pub struct SqliteChunkStore {
    pool: SqlitePool,
    backend: VectorBackend,
    dimension: usize,
}

impl SqliteChunkStore {
    /// Open (creating if needed) the database, run migrations, and probe
    /// for the vec extension.
    ///
    /// # Arguments
    /// * `config` - Database path and pool sizing
    /// * `dimension` - Embedding dimension every stored vector must have
    pub async fn connect(config: &StoreConfig, dimension: usize) -> EngineResult<Self> {
        extensions::register_sqlite_vec();

        let options = SqliteConnectOptions::new()
            .filename(&config.database_path)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await?;

        Self::from_pool(pool, dimension).await
    }

    /// Build a store on an existing pool. Runs migrations and the backend
    /// probe.
    pub async fn from_pool(pool: SqlitePool, dimension: usize) -> EngineResult<Self> {
        if dimension == 0 {
            return Err(EngineError::Configuration(
                "embedding dimension must be greater than 0".to_string(),
            ));
        }

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| EngineError::Storage(format!("migration failed: {e}")))?;

        let backend = if extensions::is_vec_available(&pool).await {
            tracing::info!("sqlite-vec active, similarity search uses vec_distance_cosine");
            VectorBackend::NativeVec
        } else {
            tracing::warn!("sqlite-vec unavailable, similarity search uses the in-process scan");
            VectorBackend::InProcess
        };

        Ok(Self {
            pool,
            backend,
            dimension,
        })
    }

    /// The distance engine this store selected at connection time.
    pub const fn backend(&self) -> VectorBackend {
        self.backend
    }

    fn check_dimension(&self, vector: &[f32]) -> EngineResult<()> {
        if vector.len() == self.dimension {
            Ok(())
        } else {
            Err(EngineError::Validation(format!(
                "embedding has {} dimensions, store expects {}",
                vector.len(),
                self.dimension
            )))
        }
    }

    /// Serialize an embedding to little-endian bytes for storage.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize an embedding from its stored bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> EngineResult<Vec<f32>> {
        if bytes.len() % 4 != 0 {
            return Err(EngineError::Storage(
                "stored embedding has invalid byte length".to_string(),
            ));
        }
        Ok(bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect())
    }

    /// Cosine distance between two vectors, 0 = identical, 2 = opposite.
    ///
    /// Mismatched lengths and zero-magnitude inputs return `f32::MAX` so
    /// those rows rank last instead of erroring a whole query.
    fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return f32::MAX;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if mag_a == 0.0 || mag_b == 0.0 {
            return f32::MAX;
        }

        1.0 - (dot / (mag_a * mag_b))
    }

    fn filter_clause(filters: &QueryFilters) -> String {
        let mut conditions = Vec::new();
        if filters.repo_url.is_some() {
            conditions.push("repo_url = ?");
        }
        if filters.path_pattern.is_some() {
            conditions.push("file_path LIKE ?");
        }
        if filters.metadata_pattern.is_some() {
            conditions.push("metadata LIKE ?");
        }
        if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        }
    }

    fn bind_filters<'q>(
        mut query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
        filters: &'q QueryFilters,
    ) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
        if let Some(repo) = &filters.repo_url {
            query = query.bind(repo);
        }
        if let Some(path) = &filters.path_pattern {
            query = query.bind(path);
        }
        if let Some(metadata) = &filters.metadata_pattern {
            query = query.bind(metadata);
        }
        query
    }

    fn record_from_row(row: &SqliteRow) -> EngineResult<(i64, ChunkRecord)> {
        let id: i64 = row.try_get("id")?;
        let embedding_bytes: Vec<u8> = row.try_get("embedding")?;
        let metadata_str: String = row.try_get("metadata")?;
        let created_at_str: String = row.try_get("created_at")?;
        let updated_at_str: String = row.try_get("updated_at")?;

        let record = ChunkRecord {
            repo_url: row.try_get("repo_url")?,
            file_path: row.try_get("file_path")?,
            chunk_index: row.try_get("chunk_index")?,
            total_chunks: row.try_get("total_chunks")?,
            title: row.try_get("title")?,
            text: row.try_get("text")?,
            token_count: row.try_get("token_count")?,
            file_type: row.try_get("file_type")?,
            is_code: row.try_get("is_code")?,
            is_implementation: row.try_get("is_implementation")?,
            embedding: Self::bytes_to_embedding(&embedding_bytes)?,
            metadata_json: serde_json::from_str(&metadata_str)
                .unwrap_or_else(|_| serde_json::json!({})),
            created_at: chrono::DateTime::parse_from_rfc3339(&created_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            updated_at: chrono::DateTime::parse_from_rfc3339(&updated_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        };

        Ok((id, record))
    }

    /// Accelerated search: distance computed per row by sqlite-vec, ordering
    /// and limit pushed into SQL.
    async fn query_native(
        &self,
        embedding: &[f32],
        k: usize,
        filters: &QueryFilters,
    ) -> EngineResult<Vec<ScoredChunk>> {
        let embedding_bytes = Self::embedding_to_bytes(embedding);
        let sql = format!(
            r"
            SELECT id, repo_url, file_path, chunk_index, total_chunks, title, text,
                   token_count, file_type, is_code, is_implementation, embedding,
                   metadata, created_at, updated_at,
                   vec_distance_cosine(embedding, ?) AS distance
            FROM chunks
            {}
            ORDER BY distance ASC
            LIMIT ?
            ",
            Self::filter_clause(filters)
        );

        let query = sqlx::query(&sql).bind(&embedding_bytes);
        let rows = Self::bind_filters(query, filters)
            .bind(k as i64)
            .fetch_all(&self.pool)
            .await?;

        let mut results = Vec::with_capacity(rows.len());
        for row in &rows {
            let distance: f32 = row.try_get("distance")?;
            let (id, record) = Self::record_from_row(row)?;
            results.push(ScoredChunk {
                id,
                record,
                score: 1.0 - distance,
            });
        }
        Ok(results)
    }

    /// Fallback search: fetch the candidate rows and rank them in Rust.
    async fn query_in_process(
        &self,
        embedding: &[f32],
        k: usize,
        filters: &QueryFilters,
    ) -> EngineResult<Vec<ScoredChunk>> {
        let sql = format!(
            r"
            SELECT id, repo_url, file_path, chunk_index, total_chunks, title, text,
                   token_count, file_type, is_code, is_implementation, embedding,
                   metadata, created_at, updated_at
            FROM chunks
            {}
            ",
            Self::filter_clause(filters)
        );

        let query = sqlx::query(&sql);
        let rows = Self::bind_filters(query, filters)
            .fetch_all(&self.pool)
            .await?;

        let mut results = Vec::with_capacity(rows.len());
        for row in &rows {
            let (id, record) = Self::record_from_row(row)?;
            let distance = Self::cosine_distance(embedding, &record.embedding);
            results.push(ScoredChunk {
                id,
                record,
                score: 1.0 - distance,
            });
        }

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(k);
        Ok(results)
    }

    async fn insert_record<'e, E>(executor: E, record: &ChunkRecord) -> EngineResult<i64>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let id = sqlx::query_scalar::<_, i64>(
            r"
            INSERT INTO chunks (
                repo_url, file_path, chunk_index, total_chunks, title, text,
                token_count, file_type, is_code, is_implementation, embedding,
                metadata, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (repo_url, file_path, chunk_index) DO UPDATE SET
                total_chunks = excluded.total_chunks,
                title = excluded.title,
                text = excluded.text,
                token_count = excluded.token_count,
                file_type = excluded.file_type,
                is_code = excluded.is_code,
                is_implementation = excluded.is_implementation,
                embedding = excluded.embedding,
                metadata = excluded.metadata,
                updated_at = excluded.updated_at
            RETURNING id
            ",
        )
        .bind(&record.repo_url)
        .bind(&record.file_path)
        .bind(record.chunk_index)
        .bind(record.total_chunks)
        .bind(&record.title)
        .bind(&record.text)
        .bind(record.token_count)
        .bind(&record.file_type)
        .bind(record.is_code)
        .bind(record.is_implementation)
        .bind(Self::embedding_to_bytes(&record.embedding))
        .bind(record.metadata_json.to_string())
        .bind(record.created_at.to_rfc3339())
        .bind(record.updated_at.to_rfc3339())
        .fetch_one(executor)
        .await?;

        Ok(id)
    }
}

#[async_trait]
impl ChunkStore for SqliteChunkStore {
    async fn query(
        &self,
        embedding: &[f32],
        k: usize,
        filters: &QueryFilters,
    ) -> EngineResult<Vec<ScoredChunk>> {
        self.check_dimension(embedding)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        match self.backend {
            VectorBackend::NativeVec => self.query_native(embedding, k, filters).await,
            VectorBackend::InProcess => self.query_in_process(embedding, k, filters).await,
        }
    }

    async fn upsert(&self, record: &ChunkRecord) -> EngineResult<i64> {
        self.check_dimension(&record.embedding)?;
        Self::insert_record(&self.pool, record).await
    }

    async fn replace_file_chunks(
        &self,
        repo_url: &str,
        file_path: &str,
        records: &[ChunkRecord],
    ) -> EngineResult<usize> {
        // Validate before touching the database so a rejected batch writes
        // nothing.
        for record in records {
            self.check_dimension(&record.embedding)?;
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunks WHERE repo_url = ? AND file_path = ?")
            .bind(repo_url)
            .bind(file_path)
            .execute(&mut *tx)
            .await?;

        for record in records {
            Self::insert_record(&mut *tx, record).await?;
        }

        tx.commit().await?;

        tracing::debug!(
            repo_url,
            file_path,
            chunks = records.len(),
            "replaced file chunks"
        );
        Ok(records.len())
    }

    async fn delete_chunks(&self, repo_url: &str, file_path: &str) -> EngineResult<usize> {
        let result = sqlx::query("DELETE FROM chunks WHERE repo_url = ? AND file_path = ?")
            .bind(repo_url)
            .bind(file_path)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() as usize)
    }

    async fn delete(&self, id: i64) -> EngineResult<()> {
        let result = sqlx::query("DELETE FROM chunks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(EngineError::Validation(format!("chunk {id} not found")));
        }
        Ok(())
    }

    async fn rebuild_index(&self) -> EngineResult<()> {
        // Best-effort: a failed rebuild leaves queries correct, just slower.
        if let Err(e) = sqlx::query("ANALYZE").execute(&self.pool).await {
            tracing::warn!("index rebuild skipped: {e}");
            return Ok(());
        }
        if let Err(e) = sqlx::query("PRAGMA optimize").execute(&self.pool).await {
            tracing::warn!("statistics refresh failed: {e}");
            return Ok(());
        }

        let count = self.count_chunks().await.unwrap_or(0);
        tracing::info!(
            chunks = count,
            backend = ?self.backend,
            "similarity index rebuilt"
        );
        Ok(())
    }

    async fn file_chunk_count(&self, repo_url: &str, file_path: &str) -> EngineResult<usize> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM chunks WHERE repo_url = ? AND file_path = ?",
        )
        .bind(repo_url)
        .bind(file_path)
        .fetch_one(&self.pool)
        .await?;
        Ok(count as usize)
    }

    async fn list_files(
        &self,
        repo_url: Option<&str>,
    ) -> EngineResult<Vec<(String, String, usize)>> {
        let sql = if repo_url.is_some() {
            r"
            SELECT repo_url, file_path, COUNT(*) as count
            FROM chunks
            WHERE repo_url = ?
            GROUP BY repo_url, file_path
            ORDER BY repo_url, file_path
            "
        } else {
            r"
            SELECT repo_url, file_path, COUNT(*) as count
            FROM chunks
            GROUP BY repo_url, file_path
            ORDER BY repo_url, file_path
            "
        };

        let mut query = sqlx::query(sql);
        if let Some(repo) = repo_url {
            query = query.bind(repo);
        }
        let rows = query.fetch_all(&self.pool).await?;

        let mut files = Vec::with_capacity(rows.len());
        for row in rows {
            let repo: String = row.try_get("repo_url")?;
            let path: String = row.try_get("file_path")?;
            let count: i64 = row.try_get("count")?;
            files.push((repo, path, count as usize));
        }
        Ok(files)
    }

    async fn count_chunks(&self) -> EngineResult<usize> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(repo: &str, path: &str, index: i64, embedding: Vec<f32>) -> ChunkRecord {
        let now = Utc::now();
        ChunkRecord {
            repo_url: repo.to_string(),
            file_path: path.to_string(),
            chunk_index: index,
            total_chunks: 1,
            title: format!("{path} [{index}]"),
            text: format!("chunk {index} of {path}"),
            token_count: 7,
            file_type: "rs".to_string(),
            is_code: true,
            is_implementation: true,
            embedding,
            metadata_json: serde_json::json!({"lang": "rust"}),
            created_at: now,
            updated_at: now,
        }
    }

    async fn test_store(dimension: usize) -> (TempDir, SqliteChunkStore) {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig {
            database_path: dir
                .path()
                .join("test.db")
                .to_string_lossy()
                .into_owned(),
            max_connections: 2,
        };
        let store = SqliteChunkStore::connect(&config, dimension).await.unwrap();
        (dir, store)
    }

    #[test]
    fn embedding_bytes_roundtrip() {
        let embedding = vec![0.1, -0.2, 0.3, 0.4, 0.5];
        let bytes = SqliteChunkStore::embedding_to_bytes(&embedding);
        let restored = SqliteChunkStore::bytes_to_embedding(&bytes).unwrap();

        assert_eq!(embedding.len(), restored.len());
        for (a, b) in embedding.iter().zip(restored.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn invalid_byte_length_is_rejected() {
        let err = SqliteChunkStore::bytes_to_embedding(&[0u8; 7]).unwrap_err();
        assert!(matches!(err, EngineError::Storage(_)));
    }

    #[test]
    fn cosine_distance_identical_and_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        assert!((SqliteChunkStore::cosine_distance(&a, &a)).abs() < 1e-6);

        let b = vec![0.0, 1.0, 0.0];
        assert!((SqliteChunkStore::cosine_distance(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_distance_degenerate_inputs_rank_last() {
        let a = vec![1.0, 0.0];
        assert_eq!(SqliteChunkStore::cosine_distance(&a, &[1.0]), f32::MAX);
        assert_eq!(SqliteChunkStore::cosine_distance(&a, &[0.0, 0.0]), f32::MAX);
    }

    #[tokio::test]
    async fn upsert_then_query_returns_the_row() {
        let (_dir, store) = test_store(3).await;
        store
            .upsert(&record("repo", "src/lib.rs", 0, vec![1.0, 0.0, 0.0]))
            .await
            .unwrap();

        let hits = store
            .query(&[1.0, 0.0, 0.0], 5, &QueryFilters::default())
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.file_path, "src/lib.rs");
        assert!(hits[0].score > 0.99);
    }

    #[tokio::test]
    async fn upsert_on_same_key_updates_in_place() {
        let (_dir, store) = test_store(2).await;
        let first = record("repo", "a.rs", 0, vec![1.0, 0.0]);
        store.upsert(&first).await.unwrap();

        let mut second = record("repo", "a.rs", 0, vec![0.0, 1.0]);
        second.text = "rewritten".to_string();
        store.upsert(&second).await.unwrap();

        assert_eq!(store.count_chunks().await.unwrap(), 1);
        let hits = store
            .query(&[0.0, 1.0], 1, &QueryFilters::default())
            .await
            .unwrap();
        assert_eq!(hits[0].record.text, "rewritten");
    }

    #[tokio::test]
    async fn upsert_preserves_created_at() {
        let (_dir, store) = test_store(1).await;
        let first = record("repo", "a.rs", 0, vec![1.0]);
        store.upsert(&first).await.unwrap();

        let mut second = record("repo", "a.rs", 0, vec![1.0]);
        second.created_at = first.created_at + chrono::Duration::hours(5);
        store.upsert(&second).await.unwrap();

        let hits = store.query(&[1.0], 1, &QueryFilters::default()).await.unwrap();
        let stored = hits[0].record.created_at;
        assert!((stored - first.created_at).num_seconds().abs() < 2);
    }

    #[tokio::test]
    async fn replace_drops_stale_higher_indexed_rows() {
        let (_dir, store) = test_store(1).await;
        let five: Vec<ChunkRecord> = (0..5).map(|i| record("repo", "big.rs", i, vec![1.0])).collect();
        store
            .replace_file_chunks("repo", "big.rs", &five)
            .await
            .unwrap();
        assert_eq!(store.file_chunk_count("repo", "big.rs").await.unwrap(), 5);

        let three: Vec<ChunkRecord> =
            (0..3).map(|i| record("repo", "big.rs", i, vec![1.0])).collect();
        store
            .replace_file_chunks("repo", "big.rs", &three)
            .await
            .unwrap();

        assert_eq!(store.file_chunk_count("repo", "big.rs").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn dimension_mismatch_writes_nothing() {
        let (_dir, store) = test_store(4).await;
        let err = store
            .upsert(&record("repo", "a.rs", 0, vec![1.0, 0.0]))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(store.count_chunks().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn replace_with_one_bad_vector_keeps_existing_rows() {
        let (_dir, store) = test_store(2).await;
        store
            .replace_file_chunks(
                "repo",
                "a.rs",
                &[record("repo", "a.rs", 0, vec![1.0, 0.0])],
            )
            .await
            .unwrap();

        let batch = vec![
            record("repo", "a.rs", 0, vec![0.0, 1.0]),
            record("repo", "a.rs", 1, vec![0.5]),
        ];
        let err = store
            .replace_file_chunks("repo", "a.rs", &batch)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(store.file_chunk_count("repo", "a.rs").await.unwrap(), 1);
        let hits = store
            .query(&[1.0, 0.0], 1, &QueryFilters::default())
            .await
            .unwrap();
        assert!(hits[0].score > 0.99, "original row should be untouched");
    }

    #[tokio::test]
    async fn filters_narrow_the_candidate_set() {
        let (_dir, store) = test_store(2).await;
        store
            .upsert(&record("repo-a", "src/lib.rs", 0, vec![1.0, 0.0]))
            .await
            .unwrap();
        store
            .upsert(&record("repo-b", "docs/guide.md", 0, vec![1.0, 0.0]))
            .await
            .unwrap();

        let filters = QueryFilters {
            repo_url: Some("repo-a".to_string()),
            ..QueryFilters::default()
        };
        let hits = store.query(&[1.0, 0.0], 10, &filters).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.repo_url, "repo-a");

        let filters = QueryFilters {
            path_pattern: Some("%.md".to_string()),
            ..QueryFilters::default()
        };
        let hits = store.query(&[1.0, 0.0], 10, &filters).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.file_path, "docs/guide.md");

        let filters = QueryFilters {
            repo_url: Some("repo-missing".to_string()),
            ..QueryFilters::default()
        };
        let hits = store.query(&[1.0, 0.0], 10, &filters).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn in_process_scan_ranks_by_similarity() {
        let (_dir, store) = test_store(2).await;
        store
            .upsert(&record("repo", "exact.rs", 0, vec![1.0, 0.0]))
            .await
            .unwrap();
        store
            .upsert(&record("repo", "near.rs", 0, vec![0.9, 0.3]))
            .await
            .unwrap();
        store
            .upsert(&record("repo", "far.rs", 0, vec![0.0, 1.0]))
            .await
            .unwrap();

        // Force the pure-Rust path regardless of extension availability.
        let scan_store = SqliteChunkStore {
            pool: store.pool.clone(),
            backend: VectorBackend::InProcess,
            dimension: 2,
        };
        let hits = scan_store
            .query(&[1.0, 0.0], 2, &QueryFilters::default())
            .await
            .unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].record.file_path, "exact.rs");
        assert_eq!(hits[1].record.file_path, "near.rs");
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn query_rejects_wrong_dimension() {
        let (_dir, store) = test_store(3).await;
        let err = store
            .query(&[1.0], 5, &QueryFilters::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn delete_chunks_removes_only_that_file() {
        let (_dir, store) = test_store(1).await;
        store.upsert(&record("repo", "a.rs", 0, vec![1.0])).await.unwrap();
        store.upsert(&record("repo", "a.rs", 1, vec![1.0])).await.unwrap();
        store.upsert(&record("repo", "b.rs", 0, vec![1.0])).await.unwrap();

        let removed = store.delete_chunks("repo", "a.rs").await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.count_chunks().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn list_files_reports_per_file_counts() {
        let (_dir, store) = test_store(1).await;
        store.upsert(&record("repo", "a.rs", 0, vec![1.0])).await.unwrap();
        store.upsert(&record("repo", "a.rs", 1, vec![1.0])).await.unwrap();
        store.upsert(&record("other", "b.rs", 0, vec![1.0])).await.unwrap();

        let all = store.list_files(None).await.unwrap();
        assert_eq!(all.len(), 2);

        let repo_only = store.list_files(Some("repo")).await.unwrap();
        assert_eq!(repo_only, vec![("repo".to_string(), "a.rs".to_string(), 2)]);
    }

    #[tokio::test]
    async fn rebuild_index_is_best_effort() {
        let (_dir, store) = test_store(1).await;
        store.upsert(&record("repo", "a.rs", 0, vec![1.0])).await.unwrap();
        store.rebuild_index().await.unwrap();
    }

    #[tokio::test]
    async fn metadata_pattern_filters_rows() {
        let (_dir, store) = test_store(1).await;
        let mut rust_chunk = record("repo", "a.rs", 0, vec![1.0]);
        rust_chunk.metadata_json = serde_json::json!({"lang": "rust"});
        let mut py_chunk = record("repo", "b.py", 0, vec![1.0]);
        py_chunk.metadata_json = serde_json::json!({"lang": "python"});
        store.upsert(&rust_chunk).await.unwrap();
        store.upsert(&py_chunk).await.unwrap();

        let filters = QueryFilters {
            metadata_pattern: Some("%python%".to_string()),
            ..QueryFilters::default()
        };
        let hits = store.query(&[1.0], 10, &filters).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.file_path, "b.py");
    }
}
