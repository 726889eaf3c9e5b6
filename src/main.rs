//! # Corpus QA CLI (`cqa`)
//!
//! The `cqa` binary ingests a plain-text corpus into a persistent vector
//! index and answers questions about it.
//!
//! ## Usage
//!
//! ```bash
//! cqa --config ./config/corpus-qa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cqa ingest` | Run (or resume) the ingestion pipeline |
//! | `cqa ask "<question>"` | Answer one question from the index |
//! | `cqa chat` | Interactive question loop |
//! | `cqa status` | Show cursor position and index size |
//!
//! ## Examples
//!
//! ```bash
//! # First ingestion pass (stops at the configured line ceiling)
//! cqa ingest
//!
//! # Pick up where the last run stopped
//! cqa ingest
//!
//! # Throw away the index and cursor and start over
//! cqa ingest --fresh
//!
//! # One-shot question, showing the retrieved passages
//! cqa ask "What does the author say about headlines?" --show-context
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use corpus_qa::config;
use corpus_qa::ingest;
use corpus_qa::progress::ProgressMode;
use corpus_qa::retrieve;
use corpus_qa::status;

/// Corpus QA — a resumable ingestion and retrieval pipeline for asking
/// questions about large plain-text corpora.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/corpus-qa.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "cqa",
    about = "Corpus QA — ingest a plain-text corpus and ask questions about it",
    version,
    long_about = "Corpus QA chunks a line-oriented text corpus into paragraph batches, embeds \
    them, and stores the vectors in a persistent index with a durable progress cursor, so \
    ingestion can stop and resume without losing work. Questions are answered by similarity \
    search over the index plus a language model call."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/corpus-qa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Run (or resume) corpus ingestion.
    ///
    /// Starts at the saved cursor, processes up to the configured line
    /// ceiling, and checkpoints the index and cursor after every batch.
    /// Safe to interrupt; the next run resumes from the last checkpoint.
    Ingest {
        /// Discard the existing index and cursor first and reingest from
        /// the beginning of the corpus.
        #[arg(long)]
        fresh: bool,

        /// Override the configured per-run line ceiling.
        #[arg(long)]
        limit: Option<u64>,

        /// Progress display on stderr: off, human, or json.
        /// Defaults to human when stderr is a terminal.
        #[arg(long)]
        progress: Option<ProgressMode>,
    },

    /// Answer a single question from the indexed corpus.
    Ask {
        /// The question to answer.
        question: String,

        /// Number of passages to retrieve (defaults to retrieval.top_k).
        #[arg(long)]
        top_k: Option<usize>,

        /// Print the retrieved passages before the answer.
        #[arg(long)]
        show_context: bool,
    },

    /// Interactive question loop. Type `exit` or `quit` to leave.
    Chat,

    /// Show the cursor position, corpus size, and index size.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Ingest {
            fresh,
            limit,
            progress,
        } => {
            let mode = progress.unwrap_or_else(ProgressMode::default_for_tty);
            ingest::run_ingest(&cfg, fresh, limit, mode).await?;
        }
        Commands::Ask {
            question,
            top_k,
            show_context,
        } => {
            retrieve::run_ask(&cfg, &question, top_k, show_context).await?;
        }
        Commands::Chat => {
            retrieve::run_chat(&cfg).await?;
        }
        Commands::Status => {
            status::run_status(&cfg)?;
        }
    }

    Ok(())
}
