//! Implementation of the `quarry status` command.

use anyhow::{Context, Result};
use clap::Args;
use console::style;

use crate::cli::context::AppContext;
use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::domain::ports::ChunkStore;
use crate::infrastructure::store::VectorBackend;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Only report files from this repository URL
    #[arg(short, long)]
    pub repo_url: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct FileStatus {
    pub repo_url: String,
    pub file_path: String,
    pub chunks: usize,
}

#[derive(Debug, serde::Serialize)]
pub struct StatusOutput {
    pub database_path: String,
    pub backend: String,
    pub provider: String,
    pub model: String,
    pub dimension: usize,
    pub total_chunks: usize,
    pub files: Vec<FileStatus>,
    #[serde(skip)]
    table: String,
}

impl CommandOutput for StatusOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!(
                "{} {} ({})",
                style("Database:").bold(),
                self.database_path,
                self.backend
            ),
            format!(
                "{} {} / {} ({} dims)",
                style("Embedding:").bold(),
                self.provider,
                self.model,
                self.dimension
            ),
            format!(
                "{} {} across {} file(s)",
                style("Chunks:").bold(),
                self.total_chunks,
                self.files.len()
            ),
        ];
        if !self.files.is_empty() {
            lines.push(String::new());
            lines.push(self.table.clone());
        }
        lines.join("\n")
    }
}

pub async fn execute(ctx: &AppContext, args: StatusArgs, json_mode: bool) -> Result<()> {
    let total_chunks = ctx
        .store
        .count_chunks()
        .await
        .context("Failed to count stored chunks")?;
    let files = ctx
        .store
        .list_files(args.repo_url.as_deref())
        .await
        .context("Failed to list stored files")?;

    let backend = match ctx.store.backend() {
        VectorBackend::NativeVec => "sqlite-vec",
        VectorBackend::InProcess => "in-process",
    };

    let table = TableFormatter::new().format_files(&files);
    let output_data = StatusOutput {
        database_path: ctx.config.store.database_path.clone(),
        backend: backend.to_string(),
        provider: ctx.embedder.provider_name().to_string(),
        model: ctx.embedder.model_id().to_string(),
        dimension: ctx.embedder.dimension(),
        total_chunks,
        files: files
            .into_iter()
            .map(|(repo_url, file_path, chunks)| FileStatus {
                repo_url,
                file_path,
                chunks,
            })
            .collect(),
        table,
    };
    output(&output_data, json_mode);

    Ok(())
}
