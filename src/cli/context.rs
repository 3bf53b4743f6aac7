//! Shared wiring for CLI commands: configuration, store, and the embedding
//! stack, constructed once per invocation.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::domain::models::QuarryConfig;
use crate::infrastructure::chunking::{Chunker, Tokenizer};
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::embeddings::{
    build_provider, EmbeddingCache, ResilientEmbedder, RetryPolicy,
};
use crate::infrastructure::store::SqliteChunkStore;
use crate::services::{IngestionService, RetrievalService};

/// Everything a command needs to run against one configured engine.
pub struct AppContext {
    pub config: QuarryConfig,
    pub store: Arc<SqliteChunkStore>,
    pub embedder: Arc<ResilientEmbedder>,
}

impl AppContext {
    /// Load configuration (optionally from an explicit file) and connect
    /// the engine.
    pub async fn init(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load()?,
        };
        Self::from_config(config).await
    }

    /// Wire the engine from an already-validated configuration.
    pub async fn from_config(config: QuarryConfig) -> Result<Self> {
        let provider = build_provider(&config.embedding)
            .context("Failed to construct the embedding provider")?;

        let cache = config
            .cache
            .enabled
            .then(|| EmbeddingCache::from_config(&config.cache));

        let embedder = Arc::new(ResilientEmbedder::new(
            provider,
            RetryPolicy::from_config(&config.retry),
            cache,
        ));

        let store = Arc::new(
            SqliteChunkStore::connect(&config.store, config.embedding.dimension)
                .await
                .context("Failed to open the chunk store")?,
        );

        Ok(Self {
            config,
            store,
            embedder,
        })
    }

    /// Ingestion pipeline bound to this context's store and embedder.
    pub fn ingestion_service(&self) -> Result<IngestionService> {
        let tokenizer = Arc::new(Tokenizer::new().context("Failed to load the tokenizer")?);
        let chunker = Arc::new(Chunker::new(tokenizer));
        Ok(IngestionService::new(
            chunker,
            Arc::clone(&self.embedder),
            self.store.clone(),
            self.config.chunking.clone(),
            self.config.ingestion.clone(),
        ))
    }

    /// Retrieval service bound to this context's store and embedder.
    pub fn retrieval_service(&self) -> RetrievalService {
        RetrievalService::new(
            Arc::clone(&self.embedder),
            self.store.clone(),
            self.config.retrieval.clone(),
        )
    }
}
