//! Embedding providers and the resilience layer around them.

pub mod azure;
pub mod cache;
pub mod factory;
pub mod ollama;
pub mod openai;
pub mod retry;

pub use azure::{AzureConfig, AzureProvider};
pub use cache::EmbeddingCache;
pub use factory::{build_provider, SUPPORTED_PROVIDERS};
pub use ollama::{OllamaConfig, OllamaProvider};
pub use openai::{OpenAiConfig, OpenAiProvider};
pub use retry::{ResilientEmbedder, RetryPolicy};
