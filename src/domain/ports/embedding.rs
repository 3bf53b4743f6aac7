//! Embedding provider port for semantic vector generation.
//!
//! Defines the trait for embedding providers that convert text into
//! dense vector representations for semantic similarity search.

use async_trait::async_trait;

use crate::domain::errors::EngineResult;

/// Hard ceiling on texts per provider request, regardless of configuration.
pub const MAX_BATCH_SIZE: usize = 100;

/// Trait for embedding providers (hosted API, managed endpoint, local daemon).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name (e.g., "openai", "azure", "ollama").
    fn name(&self) -> &'static str;

    /// Model identifier sent with each request.
    fn model_id(&self) -> &str;

    /// Embedding dimension for this provider/model; every returned vector
    /// is validated against it.
    fn dimension(&self) -> usize;

    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> EngineResult<Vec<f32>>;

    /// Generate embeddings for multiple texts, preserving input order.
    ///
    /// Implementations split oversized requests into sub-batches of at most
    /// [`MAX_BATCH_SIZE`] texts.
    async fn embed_batch(&self, texts: &[String]) -> EngineResult<Vec<Vec<f32>>>;
}

impl std::fmt::Debug for dyn EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingProvider")
            .field("name", &self.name())
            .field("model", &self.model_id())
            .field("dimension", &self.dimension())
            .finish()
    }
}

/// Rejects a vector whose length differs from the expected dimension.
///
/// A mismatch is a configuration mistake, not a transient failure, so the
/// resulting error is never retried.
pub fn validate_dimension(provider: &str, expected: usize, vector: &[f32]) -> EngineResult<()> {
    if vector.len() == expected {
        Ok(())
    } else {
        Err(crate::domain::errors::EngineError::Validation(format!(
            "provider '{provider}' returned a {}-dimensional vector, expected {expected}",
            vector.len()
        )))
    }
}
