//! Ingestion pipeline orchestration.
//!
//! Drives the full flow: corpus lines → paragraph batches → embedding
//! spans → vectors → persistent index, checkpointing after every batch.
//! The checkpoint order is the load-bearing invariant: the index is
//! persisted **before** the cursor, so an interruption between the two can
//! only cause a batch to be re-processed (and deduplicated by the index),
//! never lost. Embedding or persist failures abort the run with the cursor
//! still pointing at the last durable batch; the next run resumes there.

use std::fs;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::chunker::ParagraphChunker;
use crate::config::Config;
use crate::cursor::{CursorError, CursorFile};
use crate::embedding::{create_embedder, EmbeddingClient};
use crate::index::{FlatIndex, IndexError, VectorRecord};
use crate::progress::{IngestProgressEvent, ProgressMode, ProgressReporter};
use crate::splitter::split_spans;

/// Everything the pipeline needs to run, fixed at startup.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub corpus_path: PathBuf,
    pub index_dir: PathBuf,
    pub progress_path: PathBuf,
    pub batch_size: usize,
    pub max_lines: u64,
    pub span_chars: usize,
    pub span_overlap: usize,
}

impl IngestSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            corpus_path: config.corpus.path.clone(),
            index_dir: config.store.index_dir.clone(),
            progress_path: config.store.progress_path.clone(),
            batch_size: config.chunking.batch_size,
            max_lines: config.corpus.max_lines,
            span_chars: config.chunking.span_chars,
            span_overlap: config.chunking.span_overlap,
        }
    }
}

/// Counters from a completed ingestion run.
#[derive(Debug, Default)]
pub struct IngestSummary {
    pub batches: u64,
    pub paragraphs: u64,
    pub records_added: u64,
    pub cursor: u64,
    pub index_size: usize,
}

/// Orchestrates resumable corpus ingestion.
///
/// Built from explicit parts: an embedding client, a progress reporter,
/// and settings. No global state — tests inject a stub embedder through
/// the same constructor the CLI uses.
pub struct IngestionPipeline {
    settings: IngestSettings,
    embedder: Arc<dyn EmbeddingClient>,
    reporter: Box<dyn ProgressReporter>,
}

impl IngestionPipeline {
    pub fn new(
        settings: IngestSettings,
        embedder: Arc<dyn EmbeddingClient>,
        reporter: Box<dyn ProgressReporter>,
    ) -> Self {
        Self {
            settings,
            embedder,
            reporter,
        }
    }

    pub async fn run(&self) -> Result<IngestSummary> {
        let cursor_file = CursorFile::new(&self.settings.progress_path);
        let start = match cursor_file.load() {
            Ok(line) => line,
            Err(CursorError::Corrupt { path, content }) => {
                eprintln!(
                    "warning: progress file {} holds {:?}; restarting from the beginning",
                    path.display(),
                    content
                );
                0
            }
            Err(e) => return Err(e.into()),
        };

        let mut index = match FlatIndex::load(&self.settings.index_dir) {
            Ok(index) => Some(index),
            Err(IndexError::Missing { .. }) => None,
            Err(IndexError::Corrupt { path, reason }) => {
                eprintln!(
                    "warning: discarding unreadable index at {}: {}",
                    path.display(),
                    reason
                );
                fs::remove_dir_all(&path)
                    .with_context(|| format!("Failed to remove corrupt index at {}", path.display()))?;
                None
            }
            Err(e) => return Err(e.into()),
        };

        let file_lines = count_lines(&self.settings.corpus_path).with_context(|| {
            format!(
                "Failed to read corpus file: {}",
                self.settings.corpus_path.display()
            )
        })?;
        let total_lines = file_lines.min(start.saturating_add(self.settings.max_lines));

        self.reporter.report(IngestProgressEvent::Started {
            corpus: self.settings.corpus_path.display().to_string(),
            start_line: start,
            total_lines,
        });

        let mut chunker = ParagraphChunker::open(
            &self.settings.corpus_path,
            self.settings.batch_size,
            start,
            self.settings.max_lines,
        )?;

        let mut summary = IngestSummary {
            cursor: start,
            index_size: index.as_ref().map(FlatIndex::len).unwrap_or(0),
            ..Default::default()
        };

        while let Some(batch) = chunker.next_batch()? {
            let spans: Vec<String> = batch
                .paragraphs
                .iter()
                .flat_map(|p| split_spans(p, self.settings.span_chars, self.settings.span_overlap))
                .collect();

            let embeddings = self
                .embedder
                .embed(&spans)
                .await
                .with_context(|| format!("Embedding failed at line {}", batch.end_line))?;

            let records: Vec<VectorRecord> = spans
                .into_iter()
                .zip(embeddings)
                .map(|(text, embedding)| VectorRecord::new(text, embedding))
                .collect();

            let index = index.get_or_insert_with(FlatIndex::new);
            summary.records_added += index.add(records) as u64;

            if !index.is_empty() {
                index.persist(&self.settings.index_dir)?;
            }
            // Only now is the cursor allowed to move: the records behind it
            // are durable.
            cursor_file.save(batch.end_line)?;

            summary.batches += 1;
            summary.paragraphs += batch.paragraphs.len() as u64;
            summary.cursor = batch.end_line;
            summary.index_size = index.len();

            self.reporter.report(IngestProgressEvent::Ingested {
                line: batch.end_line,
                total_lines,
            });
        }

        Ok(summary)
    }
}

/// Count lines in the corpus, for progress totals and status reporting.
pub fn count_lines(path: &Path) -> std::io::Result<u64> {
    let file = fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let mut count = 0u64;
    for line in reader.lines() {
        line?;
        count += 1;
    }
    Ok(count)
}

/// CLI entry for `cqa ingest`.
pub async fn run_ingest(
    config: &Config,
    fresh: bool,
    limit: Option<u64>,
    progress: ProgressMode,
) -> Result<()> {
    if fresh {
        if config.store.index_dir.exists() {
            fs::remove_dir_all(&config.store.index_dir)?;
        }
        if config.store.progress_path.exists() {
            fs::remove_file(&config.store.progress_path)?;
        }
    }

    let mut settings = IngestSettings::from_config(config);
    if let Some(limit) = limit {
        settings.max_lines = limit;
    }

    let embedder = create_embedder(&config.embedding)?;
    let pipeline = IngestionPipeline::new(settings, embedder, progress.reporter());
    let summary = pipeline.run().await?;

    println!("ingest {}", config.corpus.path.display());
    println!("  batches: {}", summary.batches);
    println!("  paragraphs: {}", summary.paragraphs);
    println!("  records added: {}", summary.records_added);
    println!("  index size: {}", summary.index_size);
    println!("  cursor: {}", summary.cursor);
    println!("ok");

    Ok(())
}
