pub mod chunk;
pub mod config;
pub mod ingestion;
pub mod retrieval;

pub use chunk::{Chunk, ChunkOptions, ChunkRecord, ChunkingOutcome};
pub use config::{
    CacheConfig, EmbeddingConfig, IngestionConfig, LoggingConfig, QuarryConfig, RetrievalConfig,
    RetryConfig, StoreConfig,
};
pub use ingestion::{
    DocumentInput, FileOutcome, IngestionError, IngestionReport, IngestionStage,
};
pub use retrieval::{QueryFilters, ScoredChunk};
