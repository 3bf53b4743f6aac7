//! Process-wide embedding cache using a moka TTL cache.
//!
//! Maps `(text, model_id)` to a previously computed vector. The cache is
//! only consulted after a provider call has exhausted its retries; it is
//! populated on every successful embed. Texts are hashed so arbitrarily
//! large documents key into fixed-size entries.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sha2::{Digest, Sha256};

use crate::domain::models::CacheConfig;

/// Embedding cache keyed by `sha256(text):model_id`.
///
/// Thread-safe for concurrent readers and writers without external locking.
/// Entries expire after the configured TTL; the entry-count cap evicts the
/// oldest entries first once exceeded.
#[derive(Clone)]
pub struct EmbeddingCache {
    entries: Cache<String, Arc<Vec<f32>>>,
}

impl EmbeddingCache {
    pub fn new(ttl: Duration, max_entries: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        Self { entries }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(Duration::from_secs(config.ttl_secs), config.max_entries)
    }

    /// Look up the vector cached for this exact `(text, model_id)` pair.
    pub async fn get(&self, text: &str, model_id: &str) -> Option<Arc<Vec<f32>>> {
        self.entries.get(&cache_key(text, model_id)).await
    }

    /// Store a successfully computed vector.
    pub async fn put(&self, text: &str, model_id: &str, vector: Vec<f32>) {
        self.entries
            .insert(cache_key(text, model_id), Arc::new(vector))
            .await;
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.invalidate_all();
    }

    /// Approximate number of live entries.
    pub fn len(&self) -> u64 {
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for EmbeddingCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingCache")
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

fn cache_key(text: &str, model_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{}:{model_id}", hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_returns_what_put_stored() {
        let cache = EmbeddingCache::new(Duration::from_secs(60), 100);
        cache.put("some text", "model-a", vec![0.1, 0.2]).await;

        let hit = cache.get("some text", "model-a").await.unwrap();
        assert_eq!(hit.as_slice(), &[0.1, 0.2]);
    }

    #[tokio::test]
    async fn miss_on_different_model() {
        let cache = EmbeddingCache::new(Duration::from_secs(60), 100);
        cache.put("some text", "model-a", vec![0.1]).await;

        assert!(cache.get("some text", "model-b").await.is_none());
        assert!(cache.get("other text", "model-a").await.is_none());
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache = EmbeddingCache::new(Duration::from_millis(20), 100);
        cache.put("short lived", "m", vec![1.0]).await;
        assert!(cache.get("short lived", "m").await.is_some());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cache.get("short lived", "m").await.is_none());
    }

    #[tokio::test]
    async fn clear_empties_the_cache() {
        let cache = EmbeddingCache::new(Duration::from_secs(60), 100);
        cache.put("a", "m", vec![1.0]).await;
        cache.put("b", "m", vec![2.0]).await;

        cache.clear();
        assert!(cache.get("a", "m").await.is_none());
        assert!(cache.get("b", "m").await.is_none());
    }

    #[test]
    fn keys_separate_text_from_model() {
        // the hash covers the text only, the model id stays readable
        let key = cache_key("abc", "text-embedding-3-small");
        assert!(key.ends_with(":text-embedding-3-small"));
        assert_eq!(key.split(':').next().unwrap().len(), 64);
    }
}
