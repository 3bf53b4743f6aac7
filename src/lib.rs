//! Quarry - a retrieval-augmented knowledge engine
//!
//! Quarry chunks documents with a token-aware splitter, embeds the chunks
//! through a resilient provider client, and stores the vectors in SQLite for
//! cosine-similarity retrieval.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, ports, and the error taxonomy
//! - **Service Layer** (`services`): Ingestion and retrieval orchestration
//! - **Infrastructure Layer** (`infrastructure`): Tokenizer, embedding
//!   providers, retry/cache plumbing, and the SQLite store
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use quarry::cli::AppContext;
//! use quarry::domain::models::DocumentInput;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let ctx = AppContext::init(None).await?;
//!     let service = ctx.ingestion_service()?;
//!     let docs = vec![DocumentInput::new("repo", "README.md", "hello")];
//!     let report = service.ingest(docs, &CancellationToken::new()).await?;
//!     println!("{} file(s) ingested", report.succeeded);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{EngineError, EngineResult};
pub use domain::models::{
    Chunk, ChunkOptions, ChunkRecord, ChunkingOutcome, DocumentInput, FileOutcome, IngestionError,
    IngestionReport, IngestionStage, QueryFilters, QuarryConfig, ScoredChunk,
};
pub use domain::ports::{ChunkStore, Chunking, EmbeddingProvider};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::embeddings::{EmbeddingCache, ResilientEmbedder, RetryPolicy};
pub use infrastructure::store::SqliteChunkStore;
pub use services::{IngestionService, RetrievalService};
