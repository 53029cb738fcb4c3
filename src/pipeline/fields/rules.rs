use std::sync::LazyLock;

use regex::Regex;

use crate::pipeline::extraction::collapse_whitespace;

/// One way of reading a field out of document text.
///
/// Rules are independent: each sees the full text and returns a raw value or
/// `None`. The cascade trims and discards empty values.
pub trait FieldRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, text: &str) -> Option<String>;
}

/// Lines that begin another section of the form.
static SECTION_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:part\s+\d+\b|manifest\b|trade\s+license\b|wastes?\s+location\b|mobile\b|e-?mail\b|company\s+name\b)",
    )
    .expect("Invalid section marker pattern")
});

/// Lines that start another labeled field: capitalized word(s) followed by a colon.
static LABEL_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[A-Z][A-Za-z0-9.&/()' -]{0,40}:").expect("Invalid label line pattern")
});

/// Another known label appearing later on the same line as a value.
static INLINE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\s(?:trade\s+license|mobile|e-?mail|company\s+name|wastes?\s+location|manifest\s+(?:number|date))\s*:",
    )
    .expect("Invalid inline label pattern")
});

static TABLE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)waste\s+description\s+physical\s+state\s+quantity[^\n]*")
        .expect("Invalid table header pattern")
});

static PART_THREE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bpart\s*3\b").expect("Invalid section pattern"));

static INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("Invalid integer pattern"));

fn label_regex(label: &str) -> Regex {
    Regex::new(&format!(r"(?i)\b{label}\s*:")).expect("Invalid field label pattern")
}

fn is_stop_line(line: &str) -> bool {
    SECTION_MARKER.is_match(line) || LABEL_LINE.is_match(line)
}

/// Cut a single-line value where another known label starts.
fn cut_inline_label(value: &str) -> &str {
    match INLINE_LABEL.find(value) {
        Some(m) => &value[..m.start()],
        None => value,
    }
}

/// Split text following a label match into the rest of the label line and the lines after it.
fn split_after(text: &str, end: usize) -> (&str, std::str::Lines<'_>) {
    let rest = &text[end..];
    match rest.split_once('\n') {
        Some((line, after)) => (line, after.lines()),
        None => (rest, "".lines()),
    }
}

/// Label followed by a value that may wrap over several lines.
///
/// The value starts after the colon (or on the next non-blank line when the
/// label line is empty) and continues until a blank line, a line starting
/// another label, or a section marker.
pub struct LabeledBlockRule {
    name: &'static str,
    label: Regex,
}

impl LabeledBlockRule {
    pub fn new(name: &'static str, label_pattern: &str) -> Self {
        Self {
            name,
            label: label_regex(label_pattern),
        }
    }

    fn read_at(&self, text: &str, end: usize) -> Option<String> {
        let (first, mut lines) = split_after(text, end);
        let mut parts: Vec<&str> = Vec::new();

        let first = cut_inline_label(first).trim();
        if first.is_empty() {
            let start = lines.by_ref().find(|l| !l.trim().is_empty())?;
            if is_stop_line(start) {
                return None;
            }
            parts.push(start);
        } else {
            parts.push(first);
        }

        for line in lines {
            if line.trim().is_empty() || is_stop_line(line) {
                break;
            }
            parts.push(line);
        }

        let value = collapse_whitespace(&parts.join(" "));
        (!value.is_empty()).then_some(value)
    }
}

impl FieldRule for LabeledBlockRule {
    fn name(&self) -> &'static str {
        self.name
    }

    fn apply(&self, text: &str) -> Option<String> {
        self.label
            .find_iter(text)
            .find_map(|m| self.read_at(text, m.end()))
    }
}

/// Label followed by a single-line value, or the next non-blank line when the
/// label line is empty after the colon.
pub struct LabeledLineRule {
    name: &'static str,
    label: Regex,
}

impl LabeledLineRule {
    pub fn new(name: &'static str, label_pattern: &str) -> Self {
        Self {
            name,
            label: label_regex(label_pattern),
        }
    }

    fn read_at(&self, text: &str, end: usize) -> Option<String> {
        let (first, mut lines) = split_after(text, end);
        let first = cut_inline_label(first).trim();
        let value = if first.is_empty() {
            let next = lines.find(|l| !l.trim().is_empty())?;
            if is_stop_line(next) {
                return None;
            }
            cut_inline_label(next)
        } else {
            first
        };
        let value = collapse_whitespace(value);
        (!value.is_empty()).then_some(value)
    }
}

impl FieldRule for LabeledLineRule {
    fn name(&self) -> &'static str {
        self.name
    }

    fn apply(&self, text: &str) -> Option<String> {
        self.label
            .find_iter(text)
            .find_map(|m| self.read_at(text, m.end()))
    }
}

/// Digits directly following a label (whitespace allowed in between).
pub struct LabeledDigitsRule {
    name: &'static str,
    pattern: Regex,
}

impl LabeledDigitsRule {
    pub fn new(name: &'static str, label_pattern: &str) -> Self {
        Self {
            name,
            pattern: Regex::new(&format!(r"(?i)\b{label_pattern}\s*:\s*([0-9]+)"))
                .expect("Invalid digits pattern"),
        }
    }
}

impl FieldRule for LabeledDigitsRule {
    fn name(&self) -> &'static str {
        self.name
    }

    fn apply(&self, text: &str) -> Option<String> {
        self.pattern
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }
}

/// Date token following a label.
///
/// Strict mode accepts `D[D]/D[D]/YY[YY]` (or `-` separated); loose mode
/// accepts any run of digits, `/` and `-` that contains a digit.
pub struct LabeledDateRule {
    name: &'static str,
    pattern: Regex,
}

impl LabeledDateRule {
    pub fn strict(name: &'static str, label_pattern: &str) -> Self {
        Self {
            name,
            pattern: Regex::new(&format!(
                r"(?i)\b{label_pattern}\s*:\s*(\d{{1,2}}[/-]\d{{1,2}}[/-](?:\d{{4}}|\d{{2}}))\b"
            ))
            .expect("Invalid date pattern"),
        }
    }

    pub fn loose(name: &'static str, label_pattern: &str) -> Self {
        Self {
            name,
            pattern: Regex::new(&format!(r"(?i)\b{label_pattern}\s*:\s*([0-9/\-]*[0-9][0-9/\-]*)"))
                .expect("Invalid date pattern"),
        }
    }
}

impl FieldRule for LabeledDateRule {
    fn name(&self) -> &'static str {
        self.name
    }

    fn apply(&self, text: &str) -> Option<String> {
        self.pattern
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }
}

/// Byte offset just past the waste table header row, if present.
///
/// With `require_section`, the header only counts when a `Part 3` marker
/// precedes it.
fn table_body_start(text: &str, require_section: bool) -> Option<usize> {
    let search_from = if require_section {
        PART_THREE.find(text)?.end()
    } else {
        0
    };
    let header = TABLE_HEADER.find(&text[search_from..])?;
    Some(search_from + header.end())
}

/// First non-blank line after the waste table header.
pub struct TableRowRule {
    name: &'static str,
    require_section: bool,
}

impl TableRowRule {
    pub fn in_section(name: &'static str) -> Self {
        Self {
            name,
            require_section: true,
        }
    }

    pub fn anywhere(name: &'static str) -> Self {
        Self {
            name,
            require_section: false,
        }
    }
}

impl FieldRule for TableRowRule {
    fn name(&self) -> &'static str {
        self.name
    }

    fn apply(&self, text: &str) -> Option<String> {
        let start = table_body_start(text, self.require_section)?;
        text[start..]
            .lines()
            .find(|l| !l.trim().is_empty())
            .map(collapse_whitespace)
    }
}

/// First integer in or after the row following the waste table header.
pub struct TableQuantityRule {
    name: &'static str,
    require_section: bool,
}

impl TableQuantityRule {
    pub fn in_section(name: &'static str) -> Self {
        Self {
            name,
            require_section: true,
        }
    }

    pub fn anywhere(name: &'static str) -> Self {
        Self {
            name,
            require_section: false,
        }
    }
}

impl FieldRule for TableQuantityRule {
    fn name(&self) -> &'static str {
        self.name
    }

    fn apply(&self, text: &str) -> Option<String> {
        let start = table_body_start(text, self.require_section)?;
        INTEGER
            .find(&text[start..])
            .map(|m| m.as_str().to_string())
    }
}
