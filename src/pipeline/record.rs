use serde::{Deserialize, Serialize};
use crate::pipeline::constants::*;

/// One data line of the source, as read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub raw_text: String,
    /// 1-based position among emitted records, not among physical lines.
    pub line_number: usize,
    /// False when the line was not valid UTF-8 and `raw_text` is a lossy decode.
    pub valid_utf8: bool,
}

impl RawRecord {
    pub fn new(raw_text: impl Into<String>, line_number: usize) -> Self {
        Self {
            raw_text: raw_text.into(),
            line_number,
            valid_utf8: true,
        }
    }

    pub fn from_line_bytes(bytes: &[u8], line_number: usize) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(text) => Self::new(first_field(text), line_number),
            Err(_) => {
                let text = String::from_utf8_lossy(bytes);
                Self {
                    raw_text: first_field(&text).to_string(),
                    line_number,
                    valid_utf8: false,
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub name: String,
}

impl CanonicalRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedRecord {
    pub id: u64,
    pub name: String,
}

/// Canonical display form of a name: every space-separated word gets an upper
/// case first character and a lower case remainder, runs of spaces collapse.
///
/// Total and idempotent. A first character whose upper case form spans
/// several characters (`"ß"`, `"ﬁ"`) is kept as it is, so `"ßa"` and `"ssa"`
/// stay two different names.
pub fn normalize(raw: &str) -> String {
    let mut normalized = String::with_capacity(raw.len());

    for word in raw.trim().split(NAME_TOKEN_SEPARATOR).filter(|w| !w.is_empty()) {
        if !normalized.is_empty() {
            normalized.push(NAME_TOKEN_SEPARATOR);
        }
        capitalize_into(word, &mut normalized);
    }

    normalized.trim().to_string()
}

fn capitalize_into(word: &str, out: &mut String) {
    let mut chars = word.chars();
    let Some(first) = chars.next() else {
        return;
    };

    let mut upper = first.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(head), None) => out.push(head),
        _ => out.push(first),
    }
    out.push_str(&chars.as_str().to_lowercase());
}

/// Key under which two names are considered the same person.
pub fn fold_key(name: &str) -> String {
    name.to_lowercase()
}

/// The import only consumes the first comma-separated field of a line.
pub fn first_field(line: &str) -> &str {
    line.split(CSV_FIELD_SEPARATOR).next().unwrap_or_default()
}
