//! Durable ingestion cursor.
//!
//! [`CursorFile`] persists the number of the last source line the pipeline
//! fully consumed, as a single ASCII integer. The pipeline saves it only
//! after the vector index has been persisted, so the cursor can never claim
//! progress the index does not durably hold.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors reading or writing the cursor file.
#[derive(Debug, Error)]
pub enum CursorError {
    /// The file exists but does not contain a line number. Callers decide
    /// the fallback; the ingestion pipeline restarts from line 0.
    #[error("progress file {path} does not contain a line number (found {content:?})")]
    Corrupt { path: PathBuf, content: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A single-integer progress file marking the last fully processed line.
#[derive(Debug, Clone)]
pub struct CursorFile {
    path: PathBuf,
}

impl CursorFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the saved cursor. A missing file reads as 0 (no progress).
    pub fn load(&self) -> Result<u64, CursorError> {
        if !self.path.exists() {
            return Ok(0);
        }
        let content = fs::read_to_string(&self.path)?;
        content
            .trim()
            .parse::<u64>()
            .map_err(|_| CursorError::Corrupt {
                path: self.path.clone(),
                content: content.trim().to_string(),
            })
    }

    /// Overwrite the stored cursor.
    ///
    /// Writes a sibling temp file and renames it into place so a concurrent
    /// [`load`](Self::load) never observes a partial write.
    pub fn save(&self, line: u64) -> Result<(), CursorError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, line.to_string())?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
