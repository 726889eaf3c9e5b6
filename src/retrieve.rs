//! Retrieval and answer generation.
//!
//! [`RetrievalService`] answers one question at a time: load the persisted
//! index, embed the question, rank the top-k most similar passages, render
//! the QA prompt with the joined context, and hand it to the language
//! model. Nothing is cached between questions — every call re-runs the
//! full path, so answers always reflect the index on disk.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::config::Config;
use crate::embedding::{create_embedder, EmbeddingClient};
use crate::index::{FlatIndex, IndexError, SearchHit};
use crate::llm::{create_llm, LlmClient};

/// The fixed question-answering prompt. `{question}` and `{context}` are
/// substituted at render time.
const QA_PROMPT: &str = "You are an assistant for question-answering tasks. \
Use the following pieces of retrieved context to answer the question. \
If you don't know the answer, just say that you don't know. \
Use three sentences maximum and keep the answer concise.\n\
Question: {question} \n\
Context: {context} \n\
Answer:";

/// Errors answering a single question. Per-query: none of these corrupt
/// persisted state, and none are retried internally.
#[derive(Debug, Error)]
pub enum AnswerError {
    /// No index could be loaded — run `cqa ingest` first.
    #[error("vector index unavailable: {0}")]
    IndexUnavailable(IndexError),

    #[error("failed to embed the question: {0}")]
    Embedding(anyhow::Error),

    #[error("language model generation failed: {0}")]
    Generation(anyhow::Error),
}

/// An answer plus the ranked passages that produced it.
#[derive(Debug)]
pub struct Answer {
    pub text: String,
    pub context: Vec<SearchHit>,
}

/// Answers questions against the persisted index.
pub struct RetrievalService {
    embedder: Arc<dyn EmbeddingClient>,
    llm: Arc<dyn LlmClient>,
    index_dir: PathBuf,
    top_k: usize,
}

impl RetrievalService {
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        llm: Arc<dyn LlmClient>,
        index_dir: PathBuf,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            llm,
            index_dir,
            top_k,
        }
    }

    /// Retrieve the top-k passages for `question`, best first.
    ///
    /// Returns fewer than k hits when the index holds fewer records.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<SearchHit>, AnswerError> {
        let index = FlatIndex::load(&self.index_dir).map_err(AnswerError::IndexUnavailable)?;
        let query = self
            .embedder
            .embed_one(question)
            .await
            .map_err(AnswerError::Embedding)?;
        Ok(index.search(&query, self.top_k))
    }

    /// Answer `question` using retrieved context. The LLM's response is
    /// returned verbatim.
    pub async fn answer(&self, question: &str) -> Result<Answer, AnswerError> {
        let hits = self.retrieve(question).await?;
        let context = join_context(&hits);
        let prompt = render_prompt(question, &context);
        let text = self
            .llm
            .generate(&prompt)
            .await
            .map_err(AnswerError::Generation)?;
        Ok(Answer {
            text,
            context: hits,
        })
    }
}

/// Join retrieved passages, one per line, preserving ranked order.
pub fn join_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|h| h.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the QA prompt with `question` and `context` substituted.
pub fn render_prompt(question: &str, context: &str) -> String {
    QA_PROMPT
        .replace("{question}", question)
        .replace("{context}", context)
}

fn build_service(config: &Config, top_k: Option<usize>) -> anyhow::Result<RetrievalService> {
    let embedder = create_embedder(&config.embedding)?;
    let llm = create_llm(&config.llm)?;
    Ok(RetrievalService::new(
        embedder,
        llm,
        config.store.index_dir.clone(),
        top_k.unwrap_or(config.retrieval.top_k),
    ))
}

/// CLI entry for `cqa ask`.
pub async fn run_ask(
    config: &Config,
    question: &str,
    top_k: Option<usize>,
    show_context: bool,
) -> anyhow::Result<()> {
    let service = build_service(config, top_k)?;
    let answer = service.answer(question).await?;

    if show_context {
        println!("--- Retrieved context ---");
        for (i, hit) in answer.context.iter().enumerate() {
            println!("{}. [{:.3}] {}", i + 1, hit.score, hit.text);
        }
        println!();
    }
    println!("{}", answer.text);
    Ok(())
}

/// CLI entry for `cqa chat`: question loop until `exit` or `quit`.
pub async fn run_chat(config: &Config) -> anyhow::Result<()> {
    let service = build_service(config, None)?;
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    loop {
        write!(stdout, "ask> ")?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }

        // Per-query errors end the question, not the session.
        match service.answer(question).await {
            Ok(answer) => println!("\n{}\n", answer.text),
            Err(e) => eprintln!("error: {:#}", anyhow::Error::new(e)),
        }
    }

    Ok(())
}
