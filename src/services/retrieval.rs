//! Query-side retrieval: embed the query, rank stored chunks, and collapse
//! the hits to one chunk per source file.
//!
//! Deduplication protects downstream context assembly from being dominated
//! by many chunks of a single large file.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{QueryFilters, RetrievalConfig, ScoredChunk};
use crate::domain::ports::ChunkStore;
use crate::infrastructure::embeddings::ResilientEmbedder;

/// Similarity search over the chunk store with per-file deduplication.
pub struct RetrievalService {
    embedder: Arc<ResilientEmbedder>,
    store: Arc<dyn ChunkStore>,
    config: RetrievalConfig,
}

impl RetrievalService {
    pub fn new(
        embedder: Arc<ResilientEmbedder>,
        store: Arc<dyn ChunkStore>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            config,
        }
    }

    /// Embed `query_text`, fetch the nearest chunks, and return at most one
    /// chunk per source file.
    ///
    /// `k` overrides the configured `max_context_documents` for this call;
    /// the raw fetch is widened to at least `k` so the cap can be met even
    /// when one file dominates the neighborhood.
    pub async fn search(
        &self,
        query_text: &str,
        k: Option<usize>,
        filters: &QueryFilters,
        cancel: &CancellationToken,
    ) -> EngineResult<Vec<ScoredChunk>> {
        if query_text.trim().is_empty() {
            return Err(EngineError::Validation(
                "query text must not be empty".to_string(),
            ));
        }

        let limit = k.unwrap_or(self.config.max_context_documents);
        let raw_k = self.config.top_k.max(limit);

        let embedding = self.embedder.embed(query_text, cancel).await?;
        let hits = self.store.query(&embedding, raw_k, filters).await?;
        debug!(raw_hits = hits.len(), raw_k, "similarity query returned");

        let results = dedupe(hits, limit);
        info!(
            results = results.len(),
            limit,
            filtered = !filters.is_empty(),
            "retrieval complete"
        );
        Ok(results)
    }
}

/// Collapse chunk hits to the single best chunk per source file.
///
/// Groups by `(repo_url, file_path)`, keeps the highest-scoring chunk of
/// each group, orders the survivors by descending score, and truncates to
/// `max_distinct_files`. Equal scores break toward the lower row id so the
/// ordering is stable across runs.
pub fn dedupe(hits: Vec<ScoredChunk>, max_distinct_files: usize) -> Vec<ScoredChunk> {
    if max_distinct_files == 0 {
        return Vec::new();
    }

    let mut best: HashMap<(String, String), ScoredChunk> = HashMap::new();
    for hit in hits {
        match best.entry(hit.file_key()) {
            Entry::Occupied(mut slot) => {
                if hit.score > slot.get().score {
                    slot.insert(hit);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(hit);
            }
        }
    }

    let mut results: Vec<ScoredChunk> = best.into_values().collect();
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    results.truncate(max_distinct_files);
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;

    use crate::domain::models::{ChunkRecord, RetryConfig};
    use crate::domain::ports::EmbeddingProvider;
    use crate::infrastructure::embeddings::RetryPolicy;

    fn hit(id: i64, file_path: &str, score: f32) -> ScoredChunk {
        ScoredChunk {
            id,
            record: ChunkRecord {
                repo_url: "https://example.com/repo".to_string(),
                file_path: file_path.to_string(),
                chunk_index: 0,
                total_chunks: 1,
                title: file_path.to_string(),
                text: "chunk text".to_string(),
                token_count: 2,
                file_type: "rs".to_string(),
                is_code: true,
                is_implementation: false,
                embedding: vec![0.0; 4],
                metadata_json: serde_json::json!({}),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            score,
        }
    }

    #[test]
    fn keeps_only_the_best_chunk_per_file() {
        let hits = vec![
            hit(1, "fileA.rs", 0.90),
            hit(2, "fileA.rs", 0.85),
            hit(3, "fileA.rs", 0.70),
            hit(4, "fileB.rs", 0.80),
            hit(5, "fileB.rs", 0.60),
        ];

        let results = dedupe(hits, 5);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].record.file_path, "fileA.rs");
        assert!((results[0].score - 0.90).abs() < f32::EPSILON);
        assert_eq!(results[1].record.file_path, "fileB.rs");
        assert!((results[1].score - 0.80).abs() < f32::EPSILON);
    }

    #[test]
    fn truncates_to_the_distinct_file_cap() {
        let hits = vec![
            hit(1, "a.rs", 0.9),
            hit(2, "b.rs", 0.8),
            hit(3, "c.rs", 0.7),
            hit(4, "d.rs", 0.6),
        ];

        let results = dedupe(hits, 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].record.file_path, "a.rs");
        assert_eq!(results[1].record.file_path, "b.rs");
    }

    #[test]
    fn same_path_in_different_repos_stays_distinct() {
        let mut other = hit(2, "README.md", 0.7);
        other.record.repo_url = "https://example.com/other".to_string();

        let results = dedupe(vec![hit(1, "README.md", 0.9), other], 5);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn equal_scores_break_ties_by_row_id() {
        let hits = vec![hit(7, "b.rs", 0.5), hit(3, "a.rs", 0.5)];

        let results = dedupe(hits, 5);
        assert_eq!(results[0].id, 3);
        assert_eq!(results[1].id, 7);
    }

    #[test]
    fn zero_cap_returns_nothing() {
        assert!(dedupe(vec![hit(1, "a.rs", 0.9)], 0).is_empty());
    }

    #[test]
    fn later_duplicate_with_lower_score_is_ignored() {
        let results = dedupe(vec![hit(1, "a.rs", 0.9), hit(2, "a.rs", 0.4)], 5);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 1);
    }

    struct ConstProvider {
        dimension: usize,
        calls: AtomicU32,
    }

    #[async_trait]
    impl EmbeddingProvider for ConstProvider {
        fn name(&self) -> &'static str {
            "const"
        }

        fn model_id(&self) -> &str {
            "const-model"
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        async fn embed(&self, _text: &str) -> EngineResult<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![0.25; self.dimension])
        }

        async fn embed_batch(&self, texts: &[String]) -> EngineResult<Vec<Vec<f32>>> {
            let mut out = Vec::with_capacity(texts.len());
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }
    }

    struct CannedStore {
        hits: Mutex<Vec<ScoredChunk>>,
        seen_k: AtomicUsize,
    }

    impl CannedStore {
        fn with_hits(hits: Vec<ScoredChunk>) -> Self {
            Self {
                hits: Mutex::new(hits),
                seen_k: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ChunkStore for CannedStore {
        async fn query(
            &self,
            _embedding: &[f32],
            k: usize,
            _filters: &QueryFilters,
        ) -> EngineResult<Vec<ScoredChunk>> {
            self.seen_k.store(k, Ordering::SeqCst);
            Ok(self.hits.lock().unwrap().clone())
        }

        async fn upsert(&self, _record: &ChunkRecord) -> EngineResult<i64> {
            Ok(1)
        }

        async fn replace_file_chunks(
            &self,
            _repo_url: &str,
            _file_path: &str,
            records: &[ChunkRecord],
        ) -> EngineResult<usize> {
            Ok(records.len())
        }

        async fn delete_chunks(&self, _repo_url: &str, _file_path: &str) -> EngineResult<usize> {
            Ok(0)
        }

        async fn delete(&self, _id: i64) -> EngineResult<()> {
            Ok(())
        }

        async fn rebuild_index(&self) -> EngineResult<()> {
            Ok(())
        }

        async fn file_chunk_count(&self, _repo_url: &str, _file_path: &str) -> EngineResult<usize> {
            Ok(0)
        }

        async fn list_files(
            &self,
            _repo_url: Option<&str>,
        ) -> EngineResult<Vec<(String, String, usize)>> {
            Ok(Vec::new())
        }

        async fn count_chunks(&self) -> EngineResult<usize> {
            Ok(0)
        }
    }

    fn retrieval(store: Arc<CannedStore>, config: RetrievalConfig) -> RetrievalService {
        let policy = RetryPolicy::from_config(&RetryConfig {
            max_attempts: 1,
            base_delay_ms: 1,
            multiplier: 1.0,
            jitter_factor: 0.0,
            max_delay_ms: 5,
        });
        let provider = Arc::new(ConstProvider {
            dimension: 4,
            calls: AtomicU32::new(0),
        });
        let embedder = Arc::new(ResilientEmbedder::new(provider, policy, None));
        RetrievalService::new(embedder, store, config)
    }

    #[tokio::test]
    async fn search_returns_deduplicated_hits() {
        let store = Arc::new(CannedStore::with_hits(vec![
            hit(1, "fileA.rs", 0.90),
            hit(2, "fileA.rs", 0.85),
            hit(3, "fileB.rs", 0.80),
        ]));
        let svc = retrieval(store.clone(), RetrievalConfig::default());

        let results = svc
            .search(
                "how does chunking work",
                None,
                &QueryFilters::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].record.file_path, "fileA.rs");
        assert_eq!(results[1].record.file_path, "fileB.rs");
        assert_eq!(store.seen_k.load(Ordering::SeqCst), 20, "default raw fetch");
    }

    #[tokio::test]
    async fn k_override_widens_the_raw_fetch() {
        let store = Arc::new(CannedStore::with_hits(Vec::new()));
        let svc = retrieval(store.clone(), RetrievalConfig::default());

        let results = svc
            .search(
                "anything",
                Some(50),
                &QueryFilters::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(results.is_empty());
        assert_eq!(store.seen_k.load(Ordering::SeqCst), 50);
    }

    #[tokio::test]
    async fn blank_query_is_rejected_before_embedding() {
        let store = Arc::new(CannedStore::with_hits(Vec::new()));
        let svc = retrieval(store, RetrievalConfig::default());

        let err = svc
            .search(
                "   ",
                None,
                &QueryFilters::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Validation(_)));
    }
}
