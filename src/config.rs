use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    /// UTF-8 plain-text corpus, line-oriented; blank lines delimit paragraphs.
    pub path: PathBuf,
    /// Per-run ceiling on processed lines; ingestion checkpoints and stops
    /// there, to be resumed by a later run.
    #[serde(default = "default_max_lines")]
    pub max_lines: u64,
}

fn default_max_lines() -> u64 {
    20_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Paragraphs per checkpointed batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Maximum characters per embedding span.
    #[serde(default = "default_span_chars")]
    pub span_chars: usize,
    /// Characters shared between consecutive spans.
    #[serde(default = "default_span_overlap")]
    pub span_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            span_chars: default_span_chars(),
            span_overlap: default_span_overlap(),
        }
    }
}

fn default_batch_size() -> usize {
    5
}
fn default_span_chars() -> usize {
    1000
}
fn default_span_overlap() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Directory holding the persisted vector index.
    pub index_dir: PathBuf,
    /// Single-integer progress file marking the ingestion cursor.
    pub progress_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Passages retrieved per question.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Provider base URL (Ollama only; defaults to http://localhost:11434).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_embed_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_embedding_model(),
            url: None,
            timeout_secs: default_embed_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "ollama".to_string()
}
fn default_embedding_model() -> String {
    "mxbai-embed-large".to_string()
}
fn default_embed_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Provider base URL (Ollama only; defaults to http://localhost:11434).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_llm_model(),
            url: None,
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

fn default_llm_model() -> String {
    "deepseek-r1:14b".to_string()
}
fn default_llm_timeout_secs() -> u64 {
    120
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.corpus.max_lines == 0 {
        anyhow::bail!("corpus.max_lines must be > 0");
    }

    if config.chunking.batch_size == 0 {
        anyhow::bail!("chunking.batch_size must be > 0");
    }
    if config.chunking.span_chars == 0 {
        anyhow::bail!("chunking.span_chars must be > 0");
    }
    if config.chunking.span_overlap >= config.chunking.span_chars {
        anyhow::bail!("chunking.span_overlap must be smaller than chunking.span_chars");
    }

    if config.retrieval.top_k == 0 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    for (section, provider) in [
        ("embedding", config.embedding.provider.as_str()),
        ("llm", config.llm.provider.as_str()),
    ] {
        match provider {
            "ollama" | "openai" => {}
            other => anyhow::bail!(
                "Unknown {} provider: '{}'. Must be ollama or openai.",
                section,
                other
            ),
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_config(body: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corpus-qa.toml");
        fs::write(&path, body).unwrap();
        (dir, path)
    }

    const MINIMAL: &str = r#"
[corpus]
path = "books/advertising.txt"

[store]
index_dir = "data/index"
progress_path = "data/progress.txt"
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let (_dir, path) = write_config(MINIMAL);
        let config = load_config(&path).unwrap();
        assert_eq!(config.corpus.max_lines, 20_000);
        assert_eq!(config.chunking.batch_size, 5);
        assert_eq!(config.chunking.span_chars, 1000);
        assert_eq!(config.chunking.span_overlap, 200);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.embedding.provider, "ollama");
        assert_eq!(config.embedding.model, "mxbai-embed-large");
        assert_eq!(config.llm.model, "deepseek-r1:14b");
    }

    #[test]
    fn rejects_zero_batch_size() {
        let (_dir, path) = write_config(&format!("{}\n[chunking]\nbatch_size = 0\n", MINIMAL));
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn rejects_overlap_not_smaller_than_span() {
        let (_dir, path) = write_config(&format!(
            "{}\n[chunking]\nspan_chars = 100\nspan_overlap = 100\n",
            MINIMAL
        ));
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn rejects_unknown_provider() {
        let (_dir, path) = write_config(&format!(
            "{}\n[embedding]\nprovider = \"carrier-pigeon\"\n",
            MINIMAL
        ));
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn rejects_zero_top_k() {
        let (_dir, path) = write_config(&format!("{}\n[retrieval]\ntop_k = 0\n", MINIMAL));
        assert!(load_config(&path).is_err());
    }
}
