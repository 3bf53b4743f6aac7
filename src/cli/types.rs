//! CLI type definitions
//!
//! This module contains the clap command structures that define the CLI
//! interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::commands::forget::ForgetArgs;
use super::commands::ingest::IngestArgs;
use super::commands::query::QueryArgs;
use super::commands::reindex::ReindexArgs;
use super::commands::status::StatusArgs;

#[derive(Parser, Debug)]
#[command(name = "quarry")]
#[command(about = "Quarry - a retrieval-augmented knowledge engine", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Path to a config file (defaults to quarry.yaml in the working directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chunk, embed, and store files
    Ingest(IngestArgs),

    /// Search stored chunks by semantic similarity
    Query(QueryArgs),

    /// Show database contents and embedding configuration
    Status(StatusArgs),

    /// Remove every stored chunk for one file
    Forget(ForgetArgs),

    /// Rebuild the vector index statistics
    Reindex(ReindexArgs),
}
