//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that infrastructure adapters
//! must implement:
//! - `EmbeddingProvider`: text to vector conversion against a backend
//! - `ChunkStore`: chunk persistence and similarity search
//! - `Chunking`: document splitting under a token budget
//!
//! These traits define the contracts that allow the domain to be independent
//! of specific infrastructure implementations.

pub mod chunking;
pub mod embedding;
pub mod store;

pub use chunking::Chunking;
pub use embedding::{validate_dimension, EmbeddingProvider, MAX_BATCH_SIZE};
pub use store::ChunkStore;
