//! Implementation of the `quarry forget` command.

use anyhow::{Context, Result};
use clap::Args;
use console::style;

use crate::cli::context::AppContext;
use crate::cli::output::{output, CommandOutput};
use crate::domain::ports::ChunkStore;

#[derive(Args, Debug)]
pub struct ForgetArgs {
    /// Path of the file whose chunks should be removed
    pub file_path: String,

    /// Repository or corpus URL the file belongs to
    #[arg(short, long)]
    pub repo_url: String,
}

#[derive(Debug, serde::Serialize)]
pub struct ForgetOutput {
    pub repo_url: String,
    pub file_path: String,
    pub removed: usize,
}

impl CommandOutput for ForgetOutput {
    fn to_human(&self) -> String {
        if self.removed == 0 {
            format!(
                "{} No chunks stored for {} in {}",
                style("!").yellow().bold(),
                self.file_path,
                self.repo_url
            )
        } else {
            format!(
                "{} Removed {} chunk(s) for {}",
                style("✓").green().bold(),
                self.removed,
                self.file_path
            )
        }
    }
}

pub async fn execute(ctx: &AppContext, args: ForgetArgs, json_mode: bool) -> Result<()> {
    let removed = ctx
        .store
        .delete_chunks(&args.repo_url, &args.file_path)
        .await
        .context("Failed to delete chunks")?;

    let output_data = ForgetOutput {
        repo_url: args.repo_url,
        file_path: args.file_path,
        removed,
    };
    output(&output_data, json_mode);

    Ok(())
}
