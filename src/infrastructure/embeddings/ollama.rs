//! Ollama embedding provider adapter.
//!
//! Local inference server. The embeddings endpoint takes one prompt per
//! request, so batches are issued sequentially.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::EmbeddingConfig;
use crate::domain::ports::embedding::{validate_dimension, EmbeddingProvider};

use super::openai::{reject_empty, transport_error};

/// Configuration for the Ollama embedding provider.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Server base URL. Default: `http://localhost:11434`.
    pub base_url: String,
    /// Embedding model, e.g. `nomic-embed-text`.
    pub model: String,
    /// Expected embedding dimension.
    pub dimension: usize,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            dimension: 768,
            timeout_secs: 30,
        }
    }
}

impl From<&EmbeddingConfig> for OllamaConfig {
    fn from(config: &EmbeddingConfig) -> Self {
        Self {
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
            model: config.model.clone(),
            dimension: config.dimension,
            timeout_secs: config.timeout_secs,
        }
    }
}

/// Ollama embedding provider.
pub struct OllamaProvider {
    config: OllamaConfig,
    client: Arc<reqwest::Client>,
}

impl OllamaProvider {
    pub fn new(config: OllamaConfig) -> EngineResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EngineError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            config,
            client: Arc::new(client),
        })
    }

    async fn call_embeddings_api(&self, text: &str) -> EngineResult<Vec<f32>> {
        let url = format!(
            "{}/api/embeddings",
            self.config.base_url.trim_end_matches('/')
        );

        let request_body = OllamaEmbeddingsRequest {
            model: self.config.model.clone(),
            prompt: text.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| transport_error("ollama", &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response body".to_string());

            // A 404 usually means the model is not pulled; treat as config.
            if status.as_u16() == 429 || status.is_server_error() {
                return Err(EngineError::Provider {
                    provider: "ollama".to_string(),
                    attempts: 1,
                    message: format!("API returned {status}: {body}"),
                });
            }
            return Err(EngineError::Configuration(format!(
                "Ollama rejected the request with {status}: {body}"
            )));
        }

        let result: OllamaEmbeddingsResponse =
            response.json().await.map_err(|e| EngineError::Provider {
                provider: "ollama".to_string(),
                attempts: 1,
                message: format!("malformed embedding response: {e}"),
            })?;

        validate_dimension("ollama", self.config.dimension, &result.embedding)?;
        Ok(result.embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    async fn embed(&self, text: &str) -> EngineResult<Vec<f32>> {
        reject_empty(text)?;
        self.call_embeddings_api(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> EngineResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        for text in texts {
            reject_empty(text)?;
        }

        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.call_embeddings_api(text).await?);
        }
        Ok(vectors)
    }
}

#[derive(Debug, Serialize)]
struct OllamaEmbeddingsRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingsResponse {
    embedding: Vec<f32>,
}
