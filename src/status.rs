//! Read-only store inspection for `cqa status`.

use anyhow::Result;

use crate::config::Config;
use crate::cursor::{CursorError, CursorFile};
use crate::index::{FlatIndex, IndexError};
use crate::ingest::count_lines;

pub fn run_status(config: &Config) -> Result<()> {
    println!("status");

    match count_lines(&config.corpus.path) {
        Ok(lines) => println!("  corpus: {} ({} lines)", config.corpus.path.display(), lines),
        Err(e) => println!("  corpus: {} (unreadable: {})", config.corpus.path.display(), e),
    }

    match CursorFile::new(&config.store.progress_path).load() {
        Ok(line) => println!("  cursor: {}", line),
        Err(CursorError::Corrupt { content, .. }) => {
            println!("  cursor: corrupt ({:?}); next ingest restarts at 0", content)
        }
        Err(e) => return Err(e.into()),
    }

    match FlatIndex::load(&config.store.index_dir) {
        Ok(index) => println!(
            "  index: {} records at {}",
            index.len(),
            config.store.index_dir.display()
        ),
        Err(IndexError::Missing { .. }) => println!("  index: (none)"),
        Err(IndexError::Corrupt { reason, .. }) => {
            println!("  index: unreadable ({}); next ingest rebuilds it", reason)
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
