//! Implementation of the `quarry reindex` command.

use anyhow::{Context, Result};
use clap::Args;
use indicatif::ProgressBar;

use crate::cli::context::AppContext;
use crate::cli::output::{create_spinner, output, CommandOutput, ProgressBarExt};
use crate::domain::ports::ChunkStore;

#[derive(Args, Debug)]
pub struct ReindexArgs {}

#[derive(Debug, serde::Serialize)]
pub struct ReindexOutput {
    pub total_chunks: usize,
}

impl CommandOutput for ReindexOutput {
    fn to_human(&self) -> String {
        format!(
            "Index statistics rebuilt over {} chunk(s)",
            self.total_chunks
        )
    }
}

pub async fn execute(ctx: &AppContext, _args: ReindexArgs, json_mode: bool) -> Result<()> {
    let spinner = if json_mode {
        ProgressBar::hidden()
    } else {
        create_spinner()
    };
    spinner.set_message("Rebuilding index statistics");

    let result = ctx.store.rebuild_index().await;
    match &result {
        Ok(()) => spinner.finish_and_clear(),
        Err(_) => spinner.finish_error("Reindex failed"),
    }
    result.context("Failed to rebuild index statistics")?;

    let total_chunks = ctx
        .store
        .count_chunks()
        .await
        .context("Failed to count stored chunks")?;

    output(&ReindexOutput { total_chunks }, json_mode);
    Ok(())
}
