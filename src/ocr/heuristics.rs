//! Character-class heuristics for CJK layout decisions.
//!
//! Decides where a reconstructed line must end: sentence punctuation and
//! explicit breaks.

/// Ideographic (full-width) space, U+3000.
pub const IDEOGRAPHIC_SPACE: char = '\u{3000}';

/// Punctuation after which a line segment is always flushed.
const SEGMENT_ENDING: &[char] = &[
    '。', '！', '？', '；', '：', '…', '—',
    // closing brackets and quotes
    '」', '』', '）', '》', '〉', '】', '〕', '｝', '”', '’',
];

/// Terminators used by the punctuation-only sentence splitter.
pub const SENTENCE_TERMINATORS: &[char] = &['。', '！', '？'];

/// Returns true if `c` forces an immediate flush of the current buffer.
pub fn is_explicit_break(c: char) -> bool {
    c == '\n' || c == '\r' || c == IDEOGRAPHIC_SPACE
}

/// Returns true if the text, ignoring trailing whitespace, ends a segment.
pub fn ends_segment(text: &str) -> bool {
    text.trim_end()
        .chars()
        .next_back()
        .map(|c| SEGMENT_ENDING.contains(&c))
        .unwrap_or(false)
}
