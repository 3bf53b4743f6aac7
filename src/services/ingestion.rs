//! Ingestion orchestration: chunk, embed, and persist documents.
//!
//! Files are processed concurrently up to `max_parallel_files`, with
//! accounting per file rather than per chunk. Each file's rows are replaced
//! in one store transaction, so a failure in one file never leaves another
//! file half-written.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{
    ChunkOptions, ChunkRecord, ChunkingOutcome, DocumentInput, FileOutcome, IngestionConfig,
    IngestionError, IngestionReport, IngestionStage,
};
use crate::domain::ports::{ChunkStore, Chunking};
use crate::infrastructure::embeddings::ResilientEmbedder;

/// Drives the chunk, embed, store pipeline for batches of documents.
pub struct IngestionService {
    chunker: Arc<dyn Chunking>,
    embedder: Arc<ResilientEmbedder>,
    store: Arc<dyn ChunkStore>,
    chunk_options: ChunkOptions,
    config: IngestionConfig,
}

impl IngestionService {
    pub fn new(
        chunker: Arc<dyn Chunking>,
        embedder: Arc<ResilientEmbedder>,
        store: Arc<dyn ChunkStore>,
        chunk_options: ChunkOptions,
        config: IngestionConfig,
    ) -> Self {
        Self {
            chunker,
            embedder,
            store,
            chunk_options,
            config,
        }
    }

    /// Ingest a batch of documents with bounded file-level parallelism.
    ///
    /// Always returns a report covering the work actually performed. With
    /// `continue_on_error` a failed file is recorded and the rest of the
    /// batch proceeds; without it the first failure stops scheduling further
    /// files. A file interrupted mid-flight by cancellation is reported as
    /// failed at the stage it was in; files never started appear in neither
    /// counter.
    pub async fn ingest(
        &self,
        documents: Vec<DocumentInput>,
        cancel: &CancellationToken,
    ) -> EngineResult<IngestionReport> {
        self.chunk_options
            .validate()
            .map_err(EngineError::Validation)?;

        let started = Instant::now();
        let total = documents.len();
        let batch_id = Uuid::new_v4();
        info!(
            %batch_id,
            files = total,
            max_parallel = self.config.max_parallel_files,
            "starting ingestion batch"
        );

        let abort = AtomicBool::new(false);
        let outcomes: Vec<Option<FileOutcome>> = stream::iter(documents)
            .map(|doc| {
                let abort = &abort;
                async move {
                    if cancel.is_cancelled() || abort.load(Ordering::SeqCst) {
                        debug!(file = %doc.identity(), "skipping file, batch stopped");
                        return None;
                    }

                    let outcome = self.process_file(doc, cancel).await;
                    if matches!(outcome, FileOutcome::Failed(_)) && !self.config.continue_on_error
                    {
                        abort.store(true, Ordering::SeqCst);
                    }
                    Some(outcome)
                }
            })
            .buffer_unordered(self.config.max_parallel_files.max(1))
            .collect()
            .await;

        let mut report = IngestionReport::default();
        for outcome in outcomes.into_iter().flatten() {
            report.record(outcome);
        }
        report.elapsed = started.elapsed();

        info!(
            %batch_id,
            succeeded = report.succeeded,
            failed = report.failed,
            chunks = report.total_chunks,
            capped = report.capped_files,
            skipped = total - report.files_processed(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "ingestion batch finished"
        );
        Ok(report)
    }

    /// Run one document through the pipeline, mapping any failure to the
    /// stage it occurred in.
    async fn process_file(&self, doc: DocumentInput, cancel: &CancellationToken) -> FileOutcome {
        let chunked = match self.chunker.chunk(&doc.text, &self.chunk_options).await {
            Ok(chunked) => chunked,
            Err(err) => return stage_failure(&doc, IngestionStage::Chunking, &err),
        };

        if chunked.capped {
            warn!(
                repo_url = %doc.repo_url,
                file_path = %doc.file_path,
                kept = chunked.total_chunks(),
                cap = self.chunk_options.max_chunks_per_file,
                "file exceeded the chunk cap, tail truncated"
            );
        }

        let texts: Vec<String> = chunked.chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = if texts.is_empty() {
            Vec::new()
        } else {
            match self.embedder.embed_batch(&texts, cancel).await {
                Ok(vectors) => vectors,
                Err(err) => return stage_failure(&doc, IngestionStage::Embedding, &err),
            }
        };

        let records = build_records(&doc, &chunked, vectors);
        match self
            .store
            .replace_file_chunks(&doc.repo_url, &doc.file_path, &records)
            .await
        {
            Ok(written) => {
                debug!(
                    repo_url = %doc.repo_url,
                    file_path = %doc.file_path,
                    chunks = written,
                    "file ingested"
                );
                FileOutcome::Succeeded {
                    repo_url: doc.repo_url,
                    file_path: doc.file_path,
                    chunks: written,
                    capped: chunked.capped,
                }
            }
            Err(err) => stage_failure(&doc, IngestionStage::Storage, &err),
        }
    }
}

fn stage_failure(doc: &DocumentInput, stage: IngestionStage, err: &EngineError) -> FileOutcome {
    warn!(
        repo_url = %doc.repo_url,
        file_path = %doc.file_path,
        stage = %stage,
        error = %err,
        "file ingestion failed"
    );
    FileOutcome::Failed(IngestionError {
        repo_url: doc.repo_url.clone(),
        file_path: doc.file_path.clone(),
        stage,
        message: err.to_string(),
    })
}

/// Pair each chunk with its vector and stamp the file-level fields onto
/// every row. `total_chunks` is the post-cap count, identical on all rows.
fn build_records(
    doc: &DocumentInput,
    chunked: &ChunkingOutcome,
    vectors: Vec<Vec<f32>>,
) -> Vec<ChunkRecord> {
    let now = Utc::now();
    let total = chunked.total_chunks() as i64;
    let metadata = if doc.metadata.is_null() {
        serde_json::json!({})
    } else {
        doc.metadata.clone()
    };

    chunked
        .chunks
        .iter()
        .zip(vectors)
        .enumerate()
        .map(|(index, (chunk, embedding))| ChunkRecord {
            repo_url: doc.repo_url.clone(),
            file_path: doc.file_path.clone(),
            chunk_index: index as i64,
            total_chunks: total,
            title: doc.title.clone(),
            text: chunk.text.clone(),
            token_count: chunk.token_count as i64,
            file_type: doc.file_type.clone(),
            is_code: doc.is_code,
            is_implementation: doc.is_implementation,
            embedding,
            metadata_json: metadata.clone(),
            created_at: now,
            updated_at: now,
        })
        .collect()
}
