//! Application services orchestrating the domain ports.

pub mod ingestion;
pub mod retrieval;

pub use ingestion::IngestionService;
pub use retrieval::{dedupe, RetrievalService};
