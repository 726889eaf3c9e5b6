//! Line normalization for corpus text.
//!
//! E-book exports are littered with invisible Unicode format characters
//! (left-to-right marks, zero-width spaces, soft hyphens, BOMs) that pollute
//! paragraph text and embeddings. [`normalize_line`] strips every character
//! in Unicode general category Cf and trims surrounding whitespace.

/// Strip Unicode format control characters (category Cf) and trim.
///
/// Pure and idempotent: normalizing an already-normalized line returns it
/// unchanged.
pub fn normalize_line(line: &str) -> String {
    line.chars()
        .filter(|c| !is_format_char(*c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// True for code points in Unicode general category Cf (other, format).
///
/// Ranges per Unicode 15.1. Kept as an explicit table: the set changes
/// rarely and the common offenders (U+200B..U+200F, U+00AD, U+FEFF) are the
/// ones that actually appear in book text.
fn is_format_char(c: char) -> bool {
    matches!(c,
        '\u{00AD}'
        | '\u{0600}'..='\u{0605}'
        | '\u{061C}'
        | '\u{06DD}'
        | '\u{070F}'
        | '\u{0890}'..='\u{0891}'
        | '\u{08E2}'
        | '\u{180E}'
        | '\u{200B}'..='\u{200F}'
        | '\u{202A}'..='\u{202E}'
        | '\u{2060}'..='\u{2064}'
        | '\u{2066}'..='\u{206F}'
        | '\u{FEFF}'
        | '\u{FFF9}'..='\u{FFFB}'
        | '\u{110BD}'
        | '\u{110CD}'
        | '\u{13430}'..='\u{1343F}'
        | '\u{1BCA0}'..='\u{1BCA3}'
        | '\u{1D173}'..='\u{1D17A}'
        | '\u{E0001}'
        | '\u{E0020}'..='\u{E007F}'
    )
}
