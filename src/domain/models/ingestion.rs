//! Ingestion domain models
//!
//! Accounting is per FILE, not per chunk: operators reason about whether a
//! file made it in, not about chunk arithmetic.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One document handed to the ingestion orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInput {
    /// Repository (or corpus) the file belongs to
    pub repo_url: String,

    /// Path of the file within the repository
    pub file_path: String,

    /// Human-readable title; defaults to the file path when absent upstream
    pub title: String,

    /// Full raw text to chunk and embed
    pub text: String,

    /// File extension or logical type, e.g. "rs", "md"
    pub file_type: String,

    /// Whether the file is source code
    pub is_code: bool,

    /// Whether the file is implementation (vs docs, config, tests)
    pub is_implementation: bool,

    /// Opaque metadata persisted verbatim on every chunk row
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl DocumentInput {
    pub fn new(repo_url: impl Into<String>, file_path: impl Into<String>, text: impl Into<String>) -> Self {
        let file_path = file_path.into();
        Self {
            repo_url: repo_url.into(),
            title: file_path.clone(),
            file_path,
            text: text.into(),
            file_type: String::new(),
            is_code: false,
            is_implementation: false,
            metadata: serde_json::Value::Null,
        }
    }

    /// Identity string used in logs and error messages.
    pub fn identity(&self) -> String {
        format!("{}:{}", self.repo_url, self.file_path)
    }
}

/// Stage of the pipeline at which a file failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionStage {
    Chunking,
    Embedding,
    Storage,
}

impl std::fmt::Display for IngestionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Chunking => write!(f, "chunking"),
            Self::Embedding => write!(f, "embedding"),
            Self::Storage => write!(f, "storage"),
        }
    }
}

/// A structured per-file failure, actionable without reading server logs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionError {
    pub repo_url: String,
    pub file_path: String,
    pub stage: IngestionStage,
    pub message: String,
}

/// Outcome of one file within a batch
#[derive(Debug, Clone)]
pub enum FileOutcome {
    /// File fully ingested; carries chunk count and whether the cap fired
    Succeeded {
        repo_url: String,
        file_path: String,
        chunks: usize,
        capped: bool,
    },
    /// File failed at a stage; the batch may continue without it
    Failed(IngestionError),
}

/// Batch-level ingestion report with per-file counters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestionReport {
    /// Files fully written to the store
    pub succeeded: usize,

    /// Files that failed at any stage
    pub failed: usize,

    /// Total chunk rows written across all successful files
    pub total_chunks: usize,

    /// Files truncated at `max_chunks_per_file` (still counted as succeeded)
    pub capped_files: usize,

    /// Wall-clock duration of the batch
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,

    /// Structured errors, one per failed file
    pub errors: Vec<IngestionError>,

    /// `(repo_url, file_path)` of every successfully ingested file
    pub ingested_files: Vec<(String, String)>,
}

impl IngestionReport {
    pub fn record(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Succeeded {
                repo_url,
                file_path,
                chunks,
                capped,
            } => {
                self.succeeded += 1;
                self.total_chunks += chunks;
                if capped {
                    self.capped_files += 1;
                }
                self.ingested_files.push((repo_url, file_path));
            }
            FileOutcome::Failed(err) => {
                self.failed += 1;
                self.errors.push(err);
            }
        }
    }

    pub const fn files_processed(&self) -> usize {
        self.succeeded + self.failed
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        u64::try_from(d.as_millis()).unwrap_or(u64::MAX).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
