//! Provider selection from configuration.

use std::sync::Arc;

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::EmbeddingConfig;
use crate::domain::ports::EmbeddingProvider;

use super::azure::{AzureConfig, AzureProvider};
use super::ollama::{OllamaConfig, OllamaProvider};
use super::openai::{OpenAiConfig, OpenAiProvider};

/// Provider names accepted by [`build_provider`].
pub const SUPPORTED_PROVIDERS: &[&str] = &["openai", "azure-openai", "ollama"];

/// Construct the embedding provider named in `config.provider`.
///
/// Accepts a few aliases per provider (`azure_openai`, `local`, ...) so
/// config files written against other tools keep working.
///
/// # Errors
///
/// Returns a configuration error for unknown provider names or when the
/// selected provider is missing required settings.
pub fn build_provider(config: &EmbeddingConfig) -> EngineResult<Arc<dyn EmbeddingProvider>> {
    match config.provider.to_lowercase().as_str() {
        "openai" => {
            let provider = OpenAiProvider::new(OpenAiConfig::from(config))?;
            Ok(Arc::new(provider))
        }
        "azure" | "azure-openai" | "azure_openai" => {
            let provider = AzureProvider::new(AzureConfig::from_embedding_config(config)?)?;
            Ok(Arc::new(provider))
        }
        "ollama" | "local" => {
            let provider = OllamaProvider::new(OllamaConfig::from(config))?;
            Ok(Arc::new(provider))
        }
        other => Err(EngineError::Configuration(format!(
            "unknown embedding provider '{other}', supported: {}",
            SUPPORTED_PROVIDERS.join(", ")
        ))),
    }
}
