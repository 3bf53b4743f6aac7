//! Implementation of the `quarry ingest` command.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use console::style;
use indicatif::ProgressBar;
use tokio::fs;

use crate::cli::cancel_on_ctrl_c;
use crate::cli::context::AppContext;
use crate::cli::output::{
    create_progress_bar, create_spinner, output, CommandOutput, ProgressBarExt,
};
use crate::domain::models::{DocumentInput, IngestionError};

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Files or directories to ingest (directories are walked recursively)
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Repository or corpus URL the files belong to
    #[arg(short, long)]
    pub repo_url: String,

    /// Extra metadata stored verbatim on every chunk, as a JSON object
    #[arg(long)]
    pub metadata: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct IngestOutput {
    pub succeeded: usize,
    pub failed: usize,
    pub total_chunks: usize,
    pub capped_files: usize,
    pub unreadable_files: usize,
    pub elapsed_ms: u64,
    pub errors: Vec<IngestionError>,
}

impl CommandOutput for IngestOutput {
    fn to_human(&self) -> String {
        let summary = format!(
            "Ingested {} file(s), {} chunk(s) in {:.1}s",
            self.succeeded,
            self.total_chunks,
            self.elapsed_ms as f64 / 1000.0
        );

        let mut lines = if self.failed == 0 && self.unreadable_files == 0 {
            vec![format!("{} {summary}", style("✓").green().bold())]
        } else {
            vec![format!("{} {summary}", style("!").yellow().bold())]
        };

        if self.capped_files > 0 {
            lines.push(format!(
                "  {} file(s) hit the chunk cap and were truncated",
                self.capped_files
            ));
        }
        if self.unreadable_files > 0 {
            lines.push(format!(
                "  {} file(s) could not be read and were skipped",
                self.unreadable_files
            ));
        }
        for err in &self.errors {
            lines.push(format!(
                "  {} {} ({}): {}",
                style("✗").red(),
                err.file_path,
                err.stage,
                err.message
            ));
        }

        lines.join("\n")
    }
}

pub async fn execute(ctx: &AppContext, args: IngestArgs, json_mode: bool) -> Result<()> {
    let metadata = parse_metadata(args.metadata.as_deref())?;

    let files = collect_files(&args.paths).await?;
    if files.is_empty() {
        bail!("No files found under the given paths");
    }

    let (documents, unreadable) =
        load_documents(&files, &args.repo_url, &metadata, json_mode).await;
    if documents.is_empty() {
        bail!("None of the {} file(s) could be read", files.len());
    }

    let cancel = cancel_on_ctrl_c();
    let spinner = if json_mode {
        ProgressBar::hidden()
    } else {
        create_spinner()
    };
    spinner.set_message(format!("Embedding and storing {} file(s)", documents.len()));

    let service = ctx.ingestion_service()?;
    let report = service
        .ingest(documents, &cancel)
        .await
        .context("Ingestion failed")?;

    if report.failed == 0 {
        spinner.finish_success(format!("{} file(s) ingested", report.succeeded));
    } else {
        spinner.finish_warning(format!(
            "{} succeeded, {} failed",
            report.succeeded, report.failed
        ));
    }

    let output_data = IngestOutput {
        succeeded: report.succeeded,
        failed: report.failed,
        total_chunks: report.total_chunks,
        capped_files: report.capped_files,
        unreadable_files: unreadable,
        elapsed_ms: report.elapsed.as_millis() as u64,
        errors: report.errors,
    };
    output(&output_data, json_mode);

    if output_data.succeeded == 0 && output_data.failed > 0 {
        bail!("All {} file(s) failed to ingest", output_data.failed);
    }
    Ok(())
}

fn parse_metadata(raw: Option<&str>) -> Result<serde_json::Value> {
    let Some(raw) = raw else {
        return Ok(serde_json::Value::Null);
    };
    let value: serde_json::Value =
        serde_json::from_str(raw).context("--metadata must be valid JSON")?;
    if !value.is_object() {
        bail!("--metadata must be a JSON object");
    }
    Ok(value)
}

/// Expand the given paths, walking directories and keeping regular files.
///
/// Dot-prefixed entries are skipped during directory walks; an explicitly
/// named hidden file is still accepted.
async fn collect_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending: Vec<PathBuf> = Vec::new();

    for path in paths {
        if !path.exists() {
            bail!("Path does not exist: {}", path.display());
        }
        if path.is_file() {
            files.push(path.clone());
        } else {
            pending.push(path.clone());
        }
    }

    while let Some(dir) = pending.pop() {
        let mut entries = fs::read_dir(&dir)
            .await
            .with_context(|| format!("Failed to read directory {}", dir.display()))?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if is_hidden(&path) {
                continue;
            }
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

async fn load_documents(
    files: &[PathBuf],
    repo_url: &str,
    metadata: &serde_json::Value,
    json_mode: bool,
) -> (Vec<DocumentInput>, usize) {
    let pb = if json_mode || files.len() < 2 {
        ProgressBar::hidden()
    } else {
        create_progress_bar(files.len() as u64)
    };
    pb.set_message("Reading files");

    let mut documents = Vec::with_capacity(files.len());
    let mut unreadable = 0;
    for path in files {
        match fs::read_to_string(path).await {
            Ok(text) => {
                let (file_type, is_code, is_implementation) = classify(path);
                let mut doc =
                    DocumentInput::new(repo_url, path.to_string_lossy().into_owned(), text);
                doc.title = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| doc.file_path.clone());
                doc.file_type = file_type;
                doc.is_code = is_code;
                doc.is_implementation = is_implementation;
                doc.metadata = metadata.clone();
                documents.push(doc);
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "skipping unreadable file");
                unreadable += 1;
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    (documents, unreadable)
}

const CODE_EXTENSIONS: &[&str] = &[
    "c", "cc", "cpp", "cs", "go", "h", "hpp", "java", "js", "jsx", "kt", "py", "rb", "rs", "sh",
    "swift", "ts", "tsx",
];

/// Derive `(file_type, is_code, is_implementation)` from the path.
fn classify(path: &Path) -> (String, bool, bool) {
    let file_type = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let is_code = CODE_EXTENSIONS.contains(&file_type.as_str());
    let is_implementation = is_code && !looks_like_test(path);
    (file_type, is_code, is_implementation)
}

fn looks_like_test(path: &Path) -> bool {
    path.components()
        .any(|c| matches!(c.as_os_str().to_str(), Some("tests" | "test" | "__tests__")))
        || path
            .file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|s| {
                s.starts_with("test_")
                    || s.ends_with("_test")
                    || s.ends_with(".test")
                    || s.ends_with(".spec")
            })
}
