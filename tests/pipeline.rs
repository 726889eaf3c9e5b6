//! End-to-end ingestion pipeline tests.
//!
//! These drive [`IngestionPipeline`] against temp directories with a
//! deterministic stub embedder injected through the [`EmbeddingClient`]
//! trait, so the checkpointing and resume behavior is exercised without a
//! network. The properties under test are the durable ones: resuming never
//! loses or duplicates records, and the cursor never outruns the index.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;

use corpus_qa::cursor::CursorFile;
use corpus_qa::embedding::EmbeddingClient;
use corpus_qa::index::FlatIndex;
use corpus_qa::ingest::{IngestSettings, IngestionPipeline};
use corpus_qa::progress::NoProgress;

/// Deterministic embedder: folds bytes into a fixed-width vector.
struct HashEmbedder;

fn stub_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; 8];
    for (i, b) in text.bytes().enumerate() {
        v[i % 8] += (b as f32) / 255.0;
    }
    v
}

#[async_trait]
impl EmbeddingClient for HashEmbedder {
    fn model_name(&self) -> &str {
        "stub-hash"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| stub_vector(t)).collect())
    }
}

/// Embedder that always fails, for abort-path tests.
struct FailingEmbedder;

#[async_trait]
impl EmbeddingClient for FailingEmbedder {
    fn model_name(&self) -> &str {
        "stub-fail"
    }

    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        anyhow::bail!("embedding backend unreachable")
    }
}

struct Fixture {
    _tmp: TempDir,
    settings: IngestSettings,
}

impl Fixture {
    fn new(corpus: &str, batch_size: usize, max_lines: u64) -> Self {
        let tmp = TempDir::new().unwrap();
        let corpus_path = tmp.path().join("corpus.txt");
        fs::write(&corpus_path, corpus).unwrap();

        let settings = IngestSettings {
            corpus_path,
            index_dir: tmp.path().join("index"),
            progress_path: tmp.path().join("progress.txt"),
            batch_size,
            max_lines,
            span_chars: 1000,
            span_overlap: 200,
        };
        Self {
            _tmp: tmp,
            settings,
        }
    }

    fn pipeline(&self, embedder: Arc<dyn EmbeddingClient>) -> IngestionPipeline {
        IngestionPipeline::new(self.settings.clone(), embedder, Box::new(NoProgress))
    }

    fn with_max_lines(&self, max_lines: u64) -> IngestSettings {
        IngestSettings {
            max_lines,
            ..self.settings.clone()
        }
    }

    fn cursor(&self) -> u64 {
        CursorFile::new(&self.settings.progress_path).load().unwrap()
    }

    fn record_ids(&self) -> HashSet<String> {
        FlatIndex::load(&self.settings.index_dir)
            .unwrap()
            .records()
            .iter()
            .map(|r| r.id.clone())
            .collect()
    }

    fn index_dir(&self) -> PathBuf {
        self.settings.index_dir.clone()
    }
}

/// Eight one-line paragraphs separated by blank lines (15 lines total).
fn eight_paragraph_corpus() -> String {
    (1..=8)
        .map(|i| format!("Paragraph number {}.", i))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[tokio::test]
async fn ingest_persists_index_and_cursor() {
    let fixture = Fixture::new(&eight_paragraph_corpus(), 5, 1_000_000);
    let summary = fixture.pipeline(Arc::new(HashEmbedder)).run().await.unwrap();

    assert_eq!(summary.paragraphs, 8);
    assert_eq!(summary.records_added, 8);
    assert_eq!(summary.index_size, 8);
    assert_eq!(summary.cursor, 15);
    assert_eq!(fixture.cursor(), 15);

    // Reloading from disk sees the same records.
    let reloaded = FlatIndex::load(&fixture.index_dir()).unwrap();
    assert_eq!(reloaded.len(), 8);
}

#[tokio::test]
async fn interrupted_run_matches_uninterrupted() {
    let corpus = eight_paragraph_corpus();

    // One uninterrupted pass.
    let full = Fixture::new(&corpus, 5, 1_000_000);
    full.pipeline(Arc::new(HashEmbedder)).run().await.unwrap();

    // Same corpus, ceiling forces a stop mid-way, then a resume.
    let resumed = Fixture::new(&corpus, 5, 6);
    let first = resumed.pipeline(Arc::new(HashEmbedder)).run().await.unwrap();
    assert_eq!(first.cursor, 6);
    assert_eq!(resumed.cursor(), 6);

    let second = IngestionPipeline::new(
        resumed.with_max_lines(1_000_000),
        Arc::new(HashEmbedder),
        Box::new(NoProgress),
    )
    .run()
    .await
    .unwrap();
    assert_eq!(second.cursor, 15);

    // Crash-then-resume converges on the same cursor and record set.
    assert_eq!(resumed.cursor(), full.cursor());
    assert_eq!(resumed.record_ids(), full.record_ids());
}

#[tokio::test]
async fn rewound_cursor_reprocesses_without_duplicates() {
    // Simulates an interruption after the index persist but before the
    // cursor persist: the cursor points at an older checkpoint than the
    // index contents.
    let fixture = Fixture::new(&eight_paragraph_corpus(), 5, 1_000_000);
    let first = fixture.pipeline(Arc::new(HashEmbedder)).run().await.unwrap();
    let ids_before = fixture.record_ids();

    CursorFile::new(&fixture.settings.progress_path)
        .save(0)
        .unwrap();

    let second = fixture.pipeline(Arc::new(HashEmbedder)).run().await.unwrap();
    assert_eq!(second.records_added, 0, "reprocessed records must dedup");
    assert_eq!(second.index_size, first.index_size);
    assert_eq!(fixture.record_ids(), ids_before);
    assert_eq!(fixture.cursor(), first.cursor);
}

#[tokio::test]
async fn corrupt_index_is_discarded_and_rebuilt() {
    let fixture = Fixture::new(&eight_paragraph_corpus(), 5, 1_000_000);

    fs::create_dir_all(fixture.index_dir()).unwrap();
    fs::write(fixture.index_dir().join("records.json"), "definitely not json").unwrap();

    let summary = fixture.pipeline(Arc::new(HashEmbedder)).run().await.unwrap();
    assert_eq!(summary.index_size, 8);
    assert_eq!(FlatIndex::load(&fixture.index_dir()).unwrap().len(), 8);
}

#[tokio::test]
async fn corrupt_progress_restarts_from_zero() {
    let fixture = Fixture::new("Hello world\n\nSecond paragraph\n", 5, 1_000_000);
    fs::write(&fixture.settings.progress_path, "abc").unwrap();

    let summary = fixture.pipeline(Arc::new(HashEmbedder)).run().await.unwrap();
    assert_eq!(summary.paragraphs, 2);
    assert_eq!(summary.records_added, 2);
    // The cursor is whole again after the run.
    assert_eq!(fixture.cursor(), summary.cursor);
}

#[tokio::test]
async fn embedding_failure_aborts_without_checkpointing() {
    let fixture = Fixture::new(&eight_paragraph_corpus(), 5, 1_000_000);

    let err = fixture
        .pipeline(Arc::new(FailingEmbedder))
        .run()
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("unreachable"));

    // No cursor advance, no index on disk.
    assert_eq!(fixture.cursor(), 0);
    assert!(!fixture.index_dir().exists());
}

#[tokio::test]
async fn resume_after_failure_picks_up_cleanly() {
    let corpus = eight_paragraph_corpus();
    let fixture = Fixture::new(&corpus, 5, 6);

    // First slice succeeds, then a failing run changes nothing.
    fixture.pipeline(Arc::new(HashEmbedder)).run().await.unwrap();
    let cursor_after_success = fixture.cursor();
    let ids_after_success = fixture.record_ids();

    let failing = IngestionPipeline::new(
        fixture.with_max_lines(1_000_000),
        Arc::new(FailingEmbedder),
        Box::new(NoProgress),
    );
    assert!(failing.run().await.is_err());
    assert_eq!(fixture.cursor(), cursor_after_success);
    assert_eq!(fixture.record_ids(), ids_after_success);

    // A healthy run then finishes the corpus.
    let summary = IngestionPipeline::new(
        fixture.with_max_lines(1_000_000),
        Arc::new(HashEmbedder),
        Box::new(NoProgress),
    )
    .run()
    .await
    .unwrap();
    assert_eq!(summary.cursor, 15);
    assert_eq!(fixture.record_ids().len(), 8);
}
