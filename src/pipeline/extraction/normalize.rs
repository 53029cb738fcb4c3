//! Text normalization shared by every document kind.
//!
//! Line structure is preserved: the field rules rely on blank lines and line
//! starts to find where a labeled value ends.

const BOM: char = '\u{FEFF}';

/// Strip a leading BOM, unify line endings to `\n` and drop control characters.
///
/// Form feeds (page breaks in extracted PDF text) become newlines, tabs become
/// spaces. Blank lines are kept.
pub fn normalize_text(raw: &str) -> String {
    let without_bom = raw.strip_prefix(BOM).unwrap_or(raw);
    let unified = without_bom.replace("\r\n", "\n").replace('\r', "\n");

    unified
        .chars()
        .filter_map(|c| match c {
            '\n' => Some('\n'),
            '\u{000C}' => Some('\n'),
            '\t' => Some(' '),
            BOM => None,
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect()
}

/// Decode bytes as UTF-8 (invalid sequences replaced) and normalize.
pub fn decode_text(bytes: &[u8]) -> String {
    normalize_text(&String::from_utf8_lossy(bytes))
}

/// Collapse every run of whitespace to a single space and trim.
pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
