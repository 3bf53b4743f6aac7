//! Implementation of the `quarry query` command.

use anyhow::{Context, Result};
use clap::Args;
use console::style;

use crate::cli::cancel_on_ctrl_c;
use crate::cli::context::AppContext;
use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::domain::models::{QueryFilters, ScoredChunk};

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Natural-language query text
    pub text: String,

    /// Maximum number of distinct files to return
    #[arg(short, long)]
    pub k: Option<usize>,

    /// Only search chunks from this repository URL
    #[arg(short, long)]
    pub repo_url: Option<String>,

    /// Only search files whose path matches this SQL LIKE pattern
    #[arg(long)]
    pub path: Option<String>,

    /// Only search chunks whose metadata matches this SQL LIKE pattern
    #[arg(long)]
    pub metadata: Option<String>,

    /// Print the full chunk text instead of a snippet
    #[arg(long)]
    pub full: bool,
}

#[derive(Debug, serde::Serialize)]
pub struct QueryHit {
    pub id: i64,
    pub score: f32,
    pub repo_url: String,
    pub file_path: String,
    pub title: String,
    pub chunk_index: i64,
    pub total_chunks: i64,
    pub token_count: i64,
    pub file_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl QueryHit {
    fn from_scored(hit: &ScoredChunk, full: bool) -> Self {
        Self {
            id: hit.id,
            score: hit.score,
            repo_url: hit.record.repo_url.clone(),
            file_path: hit.record.file_path.clone(),
            title: hit.record.title.clone(),
            chunk_index: hit.record.chunk_index,
            total_chunks: hit.record.total_chunks,
            token_count: hit.record.token_count,
            file_type: hit.record.file_type.clone(),
            text: full.then(|| hit.record.text.clone()),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct QueryOutput {
    pub query: String,
    pub hits: Vec<QueryHit>,
    #[serde(skip)]
    table: String,
    #[serde(skip)]
    full: bool,
}

impl CommandOutput for QueryOutput {
    fn to_human(&self) -> String {
        if self.hits.is_empty() {
            return "No matches found.".to_string();
        }

        let mut out = self.table.clone();
        if self.full {
            for hit in &self.hits {
                out.push_str(&format!(
                    "\n\n{} {} (chunk {}/{}, score {:.3})\n{}",
                    style("──").dim(),
                    style(&hit.file_path).cyan().bold(),
                    hit.chunk_index + 1,
                    hit.total_chunks,
                    hit.score,
                    hit.text.as_deref().unwrap_or_default()
                ));
            }
        }
        out
    }
}

pub async fn execute(ctx: &AppContext, args: QueryArgs, json_mode: bool) -> Result<()> {
    let filters = QueryFilters {
        repo_url: args.repo_url,
        path_pattern: args.path,
        metadata_pattern: args.metadata,
    };

    let cancel = cancel_on_ctrl_c();
    let hits = ctx
        .retrieval_service()
        .search(&args.text, args.k, &filters, &cancel)
        .await
        .context("Query failed")?;

    let table = TableFormatter::new().format_hits(&hits);
    let output_data = QueryOutput {
        query: args.text,
        hits: hits
            .iter()
            .map(|hit| QueryHit::from_scored(hit, args.full))
            .collect(),
        table,
        full: args.full,
    };
    output(&output_data, json_mode);

    Ok(())
}
