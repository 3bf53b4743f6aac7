//! Token counting and document chunking.

pub mod chunker;
pub mod tokenizer;

pub use chunker::Chunker;
pub use tokenizer::Tokenizer;
