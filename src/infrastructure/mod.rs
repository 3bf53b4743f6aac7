//! Infrastructure layer module
//!
//! Concrete implementations behind the domain ports:
//! - Token-aware chunking (tiktoken)
//! - Embedding providers (OpenAI, Azure OpenAI, Ollama) with retry and cache
//! - SQLite chunk store with sqlite-vec acceleration
//! - Configuration management (figment)

pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod store;
