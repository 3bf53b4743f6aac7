//! Azure OpenAI embedding provider adapter.
//!
//! Same wire shape as the hosted OpenAI API but addressed per-deployment
//! and authenticated with an `api-key` header.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::EmbeddingConfig;
use crate::domain::ports::embedding::{validate_dimension, EmbeddingProvider, MAX_BATCH_SIZE};

use super::openai::{
    empty_response_error, parse_embeddings_response, reject_empty, transport_error,
};

/// Configuration for the Azure OpenAI embedding provider.
#[derive(Debug, Clone)]
pub struct AzureConfig {
    /// API key. Falls back to `AZURE_OPENAI_API_KEY` env var.
    pub api_key: Option<String>,
    /// Resource endpoint, e.g. `https://myresource.openai.azure.com`.
    pub endpoint: String,
    /// Deployment name. Defaults to the model name when unset.
    pub deployment: String,
    /// Model identifier, used for cache keys and reporting.
    pub model: String,
    /// Expected embedding dimension.
    pub dimension: usize,
    /// API version query parameter. Default: `2024-02-01`.
    pub api_version: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Texts per API request, clamped to [`MAX_BATCH_SIZE`].
    pub batch_size: usize,
}

impl AzureConfig {
    /// Build from the shared embedding config.
    ///
    /// Fails when `base_url` is unset: Azure has no hosted default endpoint.
    pub fn from_embedding_config(config: &EmbeddingConfig) -> EngineResult<Self> {
        let endpoint = config.base_url.clone().ok_or_else(|| {
            EngineError::Configuration(
                "Azure OpenAI requires base_url to be set to the resource endpoint".to_string(),
            )
        })?;
        Ok(Self {
            api_key: config.api_key.clone(),
            endpoint,
            deployment: config
                .deployment
                .clone()
                .unwrap_or_else(|| config.model.clone()),
            model: config.model.clone(),
            dimension: config.dimension,
            api_version: config.api_version.clone(),
            timeout_secs: config.timeout_secs,
            batch_size: config.batch_size,
        })
    }

    fn get_api_key(&self) -> EngineResult<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("AZURE_OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                EngineError::Configuration(
                    "Azure OpenAI API key not set. Set AZURE_OPENAI_API_KEY env var or configure api_key."
                        .to_string(),
                )
            })
    }

    fn embeddings_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/embeddings?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            self.api_version
        )
    }
}

/// Azure OpenAI embedding provider.
pub struct AzureProvider {
    config: AzureConfig,
    client: Arc<reqwest::Client>,
}

impl AzureProvider {
    pub fn new(config: AzureConfig) -> EngineResult<Self> {
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
        let url = self.config.embeddings_url();

        let request_body = AzureEmbeddingsRequest { input: texts };

        let response = self
            .client
            .post(&url)
            .header("api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| transport_error("azure-openai", &e))?;

        let vectors = parse_embeddings_response("azure-openai", response).await?;
        for vector in &vectors {
            validate_dimension("azure-openai", self.config.dimension, vector)?;
        }
        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingProvider for AzureProvider {
    fn name(&self) -> &'static str {
        "azure-openai"
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
            .ok_or_else(|| empty_response_error("azure-openai"))
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
                    provider: "azure-openai".to_string(),
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

// The deployment is addressed in the URL; the body carries only the input.
#[derive(Debug, Serialize)]
struct AzureEmbeddingsRequest {
    input: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn test_config(server_url: &str) -> AzureConfig {
        AzureConfig {
            api_key: Some("azure-key".to_string()),
            endpoint: server_url.to_string(),
            deployment: "embed-deploy".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimension: 3,
            api_version: "2024-02-01".to_string(),
            timeout_secs: 5,
            batch_size: 10,
        }
    }

    #[test]
    fn deployment_defaults_to_model() {
        let config = EmbeddingConfig {
            base_url: Some("https://res.openai.azure.com".to_string()),
            deployment: None,
            ..Default::default()
        };
        let azure = AzureConfig::from_embedding_config(&config).unwrap();
        assert_eq!(azure.deployment, config.model);
    }

    #[test]
    fn missing_endpoint_is_a_configuration_error() {
        let config = EmbeddingConfig {
            base_url: None,
            ..Default::default()
        };
        let err = AzureConfig::from_embedding_config(&config).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn url_includes_deployment_and_api_version() {
        let config = AzureConfig {
            endpoint: "https://res.openai.azure.com/".to_string(),
            ..test_config("unused")
        };
        assert_eq!(
            config.embeddings_url(),
            "https://res.openai.azure.com/openai/deployments/embed-deploy/embeddings?api-version=2024-02-01"
        );
    }

    #[tokio::test]
    async fn embed_sends_api_key_header() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock(
                "POST",
                "/openai/deployments/embed-deploy/embeddings?api-version=2024-02-01",
            )
            .match_header("api-key", "azure-key")
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "data": [{"embedding": [0.5, 0.5, 0.5], "index": 0}]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let provider = AzureProvider::new(test_config(&server.url())).unwrap();
        let vector = provider.embed("hello").await.unwrap();

        assert_eq!(vector, vec![0.5, 0.5, 0.5]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_error_is_retryable() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock(
                "POST",
                "/openai/deployments/embed-deploy/embeddings?api-version=2024-02-01",
            )
            .with_status(503)
            .with_body("service unavailable")
            .create_async()
            .await;

        let provider = AzureProvider::new(test_config(&server.url())).unwrap();
        let err = provider.embed("hello").await.unwrap_err();

        assert!(err.is_retryable());
    }
}
