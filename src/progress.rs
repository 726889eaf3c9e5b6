//! Ingestion progress reporting.
//!
//! Reports observable progress during `cqa ingest` so users watching a long
//! corpus run see how far the cursor has advanced and how much of the
//! capped total remains. Progress is emitted on **stderr** so stdout stays
//! parseable for scripts.

use std::io::Write;

/// A single progress event from the ingestion pipeline.
#[derive(Clone, Debug)]
pub enum IngestProgressEvent {
    /// Ingestion started (or resumed) at `start_line` of `total_lines`.
    Started {
        corpus: String,
        start_line: u64,
        total_lines: u64,
    },
    /// A batch was checkpointed; the cursor now sits at `line`.
    Ingested { line: u64, total_lines: u64 },
}

/// Reports ingestion progress. Implementations write to stderr.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: IngestProgressEvent);
}

/// Human-friendly progress: "ingest book.txt  1,234 / 20,000 lines".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: IngestProgressEvent) {
        let line = match &event {
            IngestProgressEvent::Started {
                corpus,
                start_line,
                total_lines,
            } => format!(
                "ingest {}  resuming at line {} of {}\n",
                corpus,
                format_number(*start_line),
                format_number(*total_lines)
            ),
            IngestProgressEvent::Ingested { line, total_lines } => format!(
                "ingest  {} / {} lines\n",
                format_number(*line),
                format_number(*total_lines)
            ),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: IngestProgressEvent) {
        let obj = match &event {
            IngestProgressEvent::Started {
                corpus,
                start_line,
                total_lines,
            } => serde_json::json!({
                "event": "progress",
                "phase": "started",
                "corpus": corpus,
                "start_line": start_line,
                "total_lines": total_lines
            }),
            IngestProgressEvent::Ingested { line, total_lines } => serde_json::json!({
                "event": "progress",
                "phase": "ingested",
                "line": line,
                "total_lines": total_lines
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: IngestProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode.
    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

impl std::str::FromStr for ProgressMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(ProgressMode::Off),
            "human" => Ok(ProgressMode::Human),
            "json" => Ok(ProgressMode::Json),
            other => anyhow::bail!("Unknown progress mode: {}. Use off, human, or json.", other),
        }
    }
}
