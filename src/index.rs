//! Persistent flat vector index.
//!
//! [`FlatIndex`] owns the embedded records and answers similarity queries
//! by brute-force cosine ranking. Durability is a single JSON document
//! (`records.json`) inside the index directory, rewritten atomically on
//! every checkpoint; the directory layout is otherwise opaque to callers.
//!
//! Record ids are SHA-256 digests of the record text, so they are stable
//! across runs and platforms and double as the deduplication key: adding a
//! record whose id is already present is a no-op, which is what makes
//! re-processing a batch after a crash-then-resume harmless.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::embedding::cosine_similarity;

const RECORDS_FILE: &str = "records.json";

/// Errors loading or persisting the index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// No index has been persisted at this path yet.
    #[error("no vector index at {path}")]
    Missing { path: PathBuf },

    /// The store directory exists but its contents cannot be read back.
    /// The ingestion pipeline discards the directory and rebuilds.
    #[error("vector index at {path} could not be read: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("failed to write vector index to {path}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One embedded span of corpus text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    /// SHA-256 hex digest of `text`.
    pub id: String,
    /// The span's source text.
    pub text: String,
    /// Embedding vector for `text`.
    pub embedding: Vec<f32>,
}

impl VectorRecord {
    pub fn new(text: String, embedding: Vec<f32>) -> Self {
        let id = record_id(&text);
        Self {
            id,
            text,
            embedding,
        }
    }
}

/// SHA-256 hex digest of the record text.
pub fn record_id(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// A ranked similarity hit.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    pub text: String,
}

#[derive(Serialize, Deserialize)]
struct IndexDocument {
    version: u32,
    records: Vec<VectorRecord>,
}

/// In-memory vector collection with durable JSON persistence.
pub struct FlatIndex {
    records: Vec<VectorRecord>,
    ids: HashSet<String>,
}

impl FlatIndex {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            ids: HashSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[VectorRecord] {
        &self.records
    }

    /// Add records, skipping any whose id is already present.
    /// Returns the number actually added.
    pub fn add(&mut self, records: Vec<VectorRecord>) -> usize {
        let mut added = 0;
        for record in records {
            if self.ids.insert(record.id.clone()) {
                self.records.push(record);
                added += 1;
            }
        }
        added
    }

    /// Top-`k` records by cosine similarity to `query`, best first.
    ///
    /// Returns fewer than `k` hits when the index is smaller than `k`.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<SearchHit> {
        let mut hits: Vec<SearchHit> = self
            .records
            .iter()
            .map(|r| SearchHit {
                id: r.id.clone(),
                score: cosine_similarity(query, &r.embedding),
                text: r.text.clone(),
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        hits
    }

    /// Load a persisted index from `dir`.
    ///
    /// A missing or empty directory is [`IndexError::Missing`]; a directory
    /// with unreadable or unparsable contents is [`IndexError::Corrupt`].
    pub fn load(dir: &Path) -> Result<Self, IndexError> {
        let missing = || IndexError::Missing {
            path: dir.to_path_buf(),
        };
        let corrupt = |reason: String| IndexError::Corrupt {
            path: dir.to_path_buf(),
            reason,
        };

        if !dir.is_dir() {
            return Err(missing());
        }
        let non_empty = fs::read_dir(dir)
            .map_err(|e| corrupt(e.to_string()))?
            .next()
            .is_some();
        if !non_empty {
            return Err(missing());
        }

        let file = dir.join(RECORDS_FILE);
        let data = fs::read_to_string(&file).map_err(|e| corrupt(e.to_string()))?;
        let doc: IndexDocument =
            serde_json::from_str(&data).map_err(|e| corrupt(e.to_string()))?;

        let ids = doc.records.iter().map(|r| r.id.clone()).collect();
        Ok(Self {
            records: doc.records,
            ids,
        })
    }

    /// Persist the index to `dir`, creating it if needed.
    ///
    /// Writes a temp file and renames it over `records.json` so an
    /// interrupted write never leaves a half-written index behind.
    pub fn persist(&self, dir: &Path) -> Result<(), IndexError> {
        let persist_err = |source: std::io::Error| IndexError::Persist {
            path: dir.to_path_buf(),
            source,
        };

        fs::create_dir_all(dir).map_err(persist_err)?;

        let doc = IndexDocument {
            version: 1,
            records: self.records.clone(),
        };
        let data = serde_json::to_string(&doc).map_err(|e| {
            persist_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;

        let tmp = dir.join(format!("{}.tmp", RECORDS_FILE));
        fs::write(&tmp, data).map_err(persist_err)?;
        fs::rename(&tmp, dir.join(RECORDS_FILE)).map_err(persist_err)?;
        Ok(())
    }
}

impl Default for FlatIndex {
    fn default() -> Self {
        Self::new()
    }
}
