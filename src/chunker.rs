//! Paragraph-preserving batch reader for corpus ingestion.
//!
//! [`ParagraphChunker`] walks a line-oriented text file and groups
//! consecutive non-blank lines into paragraphs, and paragraphs into
//! size-bounded batches. It is the resumable half of the ingestion
//! pipeline: construction takes a starting line (everything below it is
//! skipped) and a per-run ceiling on processed lines, and every yielded
//! [`Batch`] carries the line number it ended on so the caller can
//! checkpoint and resume deterministically — provided the underlying file
//! is unchanged between runs.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Lines};
use std::path::Path;

use crate::normalize::normalize_line;

/// A bounded group of paragraph texts plus the source line it ended on.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Normalized, whitespace-joined paragraphs, in corpus order.
    pub paragraphs: Vec<String>,
    /// 1-based number of the last source line consumed for this batch.
    pub end_line: u64,
}

/// Lazy, finite producer of paragraph [`Batch`]es from a corpus file.
pub struct ParagraphChunker {
    lines: Lines<BufReader<File>>,
    batch_size: usize,
    start_line: u64,
    max_lines: u64,
    line_number: u64,
    processed: u64,
    paragraph: Vec<String>,
    pending: Vec<String>,
    finished: bool,
}

impl ParagraphChunker {
    /// Open `path` for batching.
    ///
    /// Lines are numbered from 1; lines numbered below `start_line` are
    /// skipped without counting toward the `max_lines` ceiling. At most
    /// `batch_size` paragraphs are grouped per batch.
    pub fn open(
        path: &Path,
        batch_size: usize,
        start_line: u64,
        max_lines: u64,
    ) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            batch_size,
            start_line,
            max_lines,
            line_number: 0,
            processed: 0,
            paragraph: Vec::new(),
            pending: Vec::new(),
            finished: false,
        })
    }

    /// Produce the next batch, or `None` when the corpus or the line
    /// ceiling is exhausted.
    pub fn next_batch(&mut self) -> io::Result<Option<Batch>> {
        if self.finished {
            return Ok(None);
        }

        loop {
            let line = match self.lines.next() {
                Some(line) => line?,
                None => {
                    self.finished = true;
                    self.close_paragraph();
                    return Ok(self.take_pending());
                }
            };
            self.line_number += 1;
            if self.line_number < self.start_line {
                continue;
            }

            let text = normalize_line(&line);
            if text.is_empty() {
                self.close_paragraph();
            } else {
                self.paragraph.push(text);
            }
            self.processed += 1;

            if self.processed >= self.max_lines {
                // Ceiling reached: flush the partial paragraph so its lines
                // are not lost behind the advancing cursor, then terminate.
                self.finished = true;
                self.close_paragraph();
                return Ok(self.take_pending());
            }

            if self.pending.len() >= self.batch_size {
                return Ok(self.take_pending());
            }
        }
    }

    fn close_paragraph(&mut self) {
        if !self.paragraph.is_empty() {
            self.pending.push(self.paragraph.join(" "));
            self.paragraph.clear();
        }
    }

    fn take_pending(&mut self) -> Option<Batch> {
        if self.pending.is_empty() {
            return None;
        }
        Some(Batch {
            paragraphs: std::mem::take(&mut self.pending),
            end_line: self.line_number,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_corpus(lines: &[&str]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corpus.txt");
        fs::write(&path, lines.join("\n")).unwrap();
        (dir, path)
    }

    fn collect_batches(
        path: &Path,
        batch_size: usize,
        start_line: u64,
        max_lines: u64,
    ) -> Vec<Batch> {
        let mut chunker = ParagraphChunker::open(path, batch_size, start_line, max_lines).unwrap();
        let mut batches = Vec::new();
        while let Some(batch) = chunker.next_batch().unwrap() {
            batches.push(batch);
        }
        batches
    }

    #[test]
    fn two_paragraphs_one_batch_at_eof() {
        let (_dir, path) = write_corpus(&["First paragraph.", "", "Second paragraph."]);
        let batches = collect_batches(&path, 5, 0, 1_000_000);
        assert_eq!(batches.len(), 1);
        assert_eq!(
            batches[0].paragraphs,
            vec!["First paragraph.".to_string(), "Second paragraph.".to_string()]
        );
        assert_eq!(batches[0].end_line, 3);
    }

    #[test]
    fn multi_line_paragraph_is_joined() {
        let (_dir, path) = write_corpus(&["One line,", "another line.", "", "Next."]);
        let batches = collect_batches(&path, 5, 0, 1_000_000);
        assert_eq!(
            batches[0].paragraphs,
            vec!["One line, another line.".to_string(), "Next.".to_string()]
        );
    }

    #[test]
    fn batch_size_bound_and_end_lines() {
        let mut lines = Vec::new();
        for i in 1..=12 {
            if i > 1 {
                lines.push(String::new());
            }
            lines.push(format!("Paragraph {}.", i));
        }
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let (_dir, path) = write_corpus(&refs);

        let batches = collect_batches(&path, 5, 0, 1_000_000);
        let sizes: Vec<usize> = batches.iter().map(|b| b.paragraphs.len()).collect();
        assert_eq!(sizes, vec![5, 5, 2]);
        for batch in &batches {
            assert!(batch.paragraphs.len() <= 5);
        }
        // Size-bound yields land on the blank line that closed the fifth
        // paragraph; the final yield lands on the last line of the file.
        let ends: Vec<u64> = batches.iter().map(|b| b.end_line).collect();
        assert_eq!(ends, vec![10, 20, 23]);
    }

    #[test]
    fn never_yields_empty_paragraphs() {
        let (_dir, path) = write_corpus(&["", "  ", "\u{200E}", "Real text.", "", ""]);
        let batches = collect_batches(&path, 5, 0, 1_000_000);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].paragraphs, vec!["Real text.".to_string()]);
        for batch in &batches {
            for p in &batch.paragraphs {
                assert!(!p.is_empty());
            }
        }
    }

    #[test]
    fn blank_corpus_yields_nothing() {
        let (_dir, path) = write_corpus(&["", "   ", ""]);
        assert!(collect_batches(&path, 5, 0, 1_000_000).is_empty());
    }

    #[test]
    fn start_line_skips_processed_lines() {
        let (_dir, path) = write_corpus(&["Alpha.", "", "Beta.", "", "Gamma."]);
        let batches = collect_batches(&path, 5, 3, 1_000_000);
        assert_eq!(batches.len(), 1);
        assert_eq!(
            batches[0].paragraphs,
            vec!["Beta.".to_string(), "Gamma.".to_string()]
        );
        assert_eq!(batches[0].end_line, 5);
    }

    #[test]
    fn ceiling_flushes_partial_paragraph() {
        let (_dir, path) = write_corpus(&["Line one.", "Line two.", "Line three."]);
        let mut chunker = ParagraphChunker::open(&path, 5, 0, 2).unwrap();
        let batch = chunker.next_batch().unwrap().expect("one batch");
        assert_eq!(batch.paragraphs, vec!["Line one. Line two.".to_string()]);
        assert_eq!(batch.end_line, 2);
        assert!(chunker.next_batch().unwrap().is_none());
    }

    #[test]
    fn ceiling_on_paragraph_boundary() {
        let (_dir, path) = write_corpus(&["Alpha.", "", "Beta."]);
        let batches = collect_batches(&path, 5, 0, 2);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].paragraphs, vec!["Alpha.".to_string()]);
        assert_eq!(batches[0].end_line, 2);
    }

    #[test]
    fn ceiling_counts_from_resumption() {
        // Skipped lines must not count toward the ceiling.
        let (_dir, path) = write_corpus(&["Old.", "", "New one.", "", "New two."]);
        let batches = collect_batches(&path, 5, 3, 3);
        assert_eq!(batches.len(), 1);
        // Lines 3,4,5 processed: "New one." closed at 4, "New two." flushed
        // at the ceiling on line 5.
        assert_eq!(
            batches[0].paragraphs,
            vec!["New one.".to_string(), "New two.".to_string()]
        );
        assert_eq!(batches[0].end_line, 5);
    }

    #[test]
    fn exhausted_chunker_stays_exhausted() {
        let (_dir, path) = write_corpus(&["Only."]);
        let mut chunker = ParagraphChunker::open(&path, 5, 0, 1_000_000).unwrap();
        assert!(chunker.next_batch().unwrap().is_some());
        assert!(chunker.next_batch().unwrap().is_none());
        assert!(chunker.next_batch().unwrap().is_none());
    }
}
