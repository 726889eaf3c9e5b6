//! Span subdivision for embedding.
//!
//! Embedding models take bounded input, so paragraphs are cut into
//! character-windowed spans with overlap between neighbors to preserve
//! semantic continuity across the cut. Windows prefer to end after a
//! whitespace character so words are not split when a break point exists.

/// Split `text` into spans of at most `max_chars` characters, with
/// `overlap` characters shared between consecutive spans.
///
/// Text at or under the limit comes back as a single span. Spans are
/// trimmed; empty spans are dropped. Counts are Unicode scalar values,
/// never bytes, so multi-byte text is split safely.
pub fn split_spans(text: &str, max_chars: usize, overlap: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();

    if total <= max_chars {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        return vec![trimmed.to_string()];
    }

    // Window stride must make forward progress even with a large overlap.
    let overlap = overlap.min(max_chars.saturating_sub(1));

    let mut spans = Vec::new();
    let mut start = 0usize;

    loop {
        let hard_end = (start + max_chars).min(total);
        let mut end = hard_end;

        // Prefer to break after the last whitespace in the window, unless
        // that would collapse the span into the overlap region.
        if hard_end < total {
            if let Some(rel) = chars[start..hard_end].iter().rposition(|c| c.is_whitespace()) {
                let candidate = start + rel + 1;
                if candidate > start + overlap {
                    end = candidate;
                }
            }
        }

        let span: String = chars[start..end].iter().collect();
        let span = span.trim();
        if !span.is_empty() {
            spans.push(span.to_string());
        }

        if end >= total {
            break;
        }
        start = end - overlap;
    }

    spans
}
