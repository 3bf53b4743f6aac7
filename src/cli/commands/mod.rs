//! CLI command implementations.

pub mod forget;
pub mod ingest;
pub mod query;
pub mod reindex;
pub mod status;
