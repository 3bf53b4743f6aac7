//! OpenAI embedding provider adapter.
//!
//! Talks to the hosted `/v1/embeddings` endpoint. Transport failures, rate
//! limits, and 5xx responses are surfaced as retryable provider errors;
//! auth and request mistakes fail fast.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::EmbeddingConfig;
use crate::domain::ports::embedding::{validate_dimension, EmbeddingProvider, MAX_BATCH_SIZE};

/// Configuration for the OpenAI embedding provider.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key. Falls back to `OPENAI_API_KEY` env var.
    pub api_key: Option<String>,
    /// Base URL for the API. Default: `https://api.openai.com/v1`.
    pub base_url: String,
    /// Embedding model. Default: `text-embedding-3-small`.
    pub model: String,
    /// Expected embedding dimension. Default: 1536.
    pub dimension: usize,
    /// Request timeout in seconds. Default: 30.
    pub timeout_secs: u64,
    /// Texts per API request, clamped to [`MAX_BATCH_SIZE`]. Default: 10.
    pub batch_size: usize,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimension: 1536,
            timeout_secs: 30,
            batch_size: 10,
        }
    }
}

impl From<&EmbeddingConfig> for OpenAiConfig {
    fn from(config: &EmbeddingConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model: config.model.clone(),
            dimension: config.dimension,
            timeout_secs: config.timeout_secs,
            batch_size: config.batch_size,
        }
    }
}

impl OpenAiConfig {
    fn get_api_key(&self) -> EngineResult<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                EngineError::Configuration(
                    "OpenAI API key not set. Set OPENAI_API_KEY env var or configure api_key."
                        .to_string(),
                )
            })
    }
}

/// OpenAI embedding provider.
pub struct OpenAiProvider {
    config: OpenAiConfig,
    client: Arc<reqwest::Client>,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> EngineResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EngineError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            config,
            client: Arc::new(client),
        })
    }

    async fn call_embeddings_api(&self, texts: Vec<String>) -> EngineResult<Vec<Vec<f32>>> {
        let api_key = self.config.get_api_key()?;
        let url = format!("{}/embeddings", self.config.base_url);

        let request_body = EmbeddingsRequest {
            model: self.config.model.clone(),
            input: texts,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| transport_error("openai", &e))?;

        let vectors = parse_embeddings_response("openai", response).await?;
        for vector in &vectors {
            validate_dimension("openai", self.config.dimension, vector)?;
        }
        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    async fn embed(&self, text: &str) -> EngineResult<Vec<f32>> {
        reject_empty(text)?;
        let results = self.call_embeddings_api(vec![text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| empty_response_error("openai"))
    }

    async fn embed_batch(&self, texts: &[String]) -> EngineResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        for text in texts {
            reject_empty(text)?;
        }

        let batch = self.config.batch_size.clamp(1, MAX_BATCH_SIZE);
        let mut all_vectors = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(batch) {
            let vectors = self.call_embeddings_api(chunk.to_vec()).await?;
            if vectors.len() != chunk.len() {
                return Err(EngineError::Provider {
                    provider: "openai".to_string(),
                    attempts: 1,
                    message: format!(
                        "response held {} vectors for {} inputs",
                        vectors.len(),
                        chunk.len()
                    ),
                });
            }
            all_vectors.extend(vectors);
        }

        Ok(all_vectors)
    }
}

// -- shared helpers for OpenAI-shaped APIs --

pub(super) fn reject_empty(text: &str) -> EngineResult<()> {
    if text.trim().is_empty() {
        Err(EngineError::Validation(
            "cannot embed empty text".to_string(),
        ))
    } else {
        Ok(())
    }
}

pub(super) fn transport_error(provider: &str, err: &reqwest::Error) -> EngineError {
    EngineError::Provider {
        provider: provider.to_string(),
        attempts: 1,
        message: format!("request failed: {err}"),
    }
}

pub(super) fn empty_response_error(provider: &str) -> EngineError {
    EngineError::Provider {
        provider: provider.to_string(),
        attempts: 1,
        message: "empty embedding response".to_string(),
    }
}

/// Map a non-success status to the error taxonomy and parse a success body.
///
/// 429 and 5xx are transient (retryable); other 4xx are configuration
/// mistakes and fail fast.
pub(super) async fn parse_embeddings_response(
    provider: &str,
    response: reqwest::Response,
) -> EngineResult<Vec<Vec<f32>>> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unable to read response body".to_string());

        if status.as_u16() == 429 || status.is_server_error() {
            return Err(EngineError::Provider {
                provider: provider.to_string(),
                attempts: 1,
                message: format!("API returned {status}: {body}"),
            });
        }
        return Err(EngineError::Configuration(format!(
            "embedding API rejected the request with {status}: {body}"
        )));
    }

    let result: EmbeddingsResponse = response.json().await.map_err(|e| EngineError::Provider {
        provider: provider.to_string(),
        attempts: 1,
        message: format!("malformed embedding response: {e}"),
    })?;

    // Sort by index to maintain input order
    let mut data = result.data;
    data.sort_by_key(|d| d.index);

    Ok(data.into_iter().map(|d| d.embedding).collect())
}

// -- OpenAI API request/response types --

#[derive(Debug, Serialize)]
struct EmbeddingsRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct EmbeddingsResponse {
    pub(super) data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
pub(super) struct EmbeddingData {
    pub(super) embedding: Vec<f32>,
    pub(super) index: usize,
}
