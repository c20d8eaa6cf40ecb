//! A small, line-oriented INI reader.
//!
//! The original tool reads its settings with a hand-rolled scanner over flat
//! `section.key = value` pairs (Design Notes §9, "Dynamic named parameters").
//! We keep that shape: a pure function from text to an ordered multimap of
//! `(section, key, value)` triples, so the enumerated-option mapping in
//! [`crate::settings`] can stay separate from the scanning itself and stay
//! unit-testable against canned text.

use crate::error::ConfigError;

/// One `key = value` entry, with its source line for error reporting and
/// because some keys (`argument`, under `[gdb]`) are legitimately repeated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub section: String,
    pub key: String,
    pub value: String,
    pub line: usize,
}

/// Scan `text` into an ordered list of entries. Blank lines and lines whose
/// first non-whitespace character is `;` or `#` are comments and skipped.
/// A bare `key = value` before any `[section]` header is rejected as
/// malformed rather than silently assigned to an implicit section.
pub fn parse(text: &str) -> Result<Vec<RawEntry>, ConfigError> {
    let mut entries = Vec::new();
    let mut section: Option<String> = None;

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if let Some(stripped) = line.strip_prefix('[') {
            let Some(name) = stripped.strip_suffix(']') else {
                return Err(ConfigError::Ini {
                    line: line_no,
                    reason: format!("unterminated section header: {line}"),
                });
            };
            section = Some(name.trim().to_string());
            continue;
        }
        let Some(eq) = line.find('=') else {
            return Err(ConfigError::Ini {
                line: line_no,
                reason: format!("expected `key = value`, found: {line}"),
            });
        };
        let Some(section) = section.clone() else {
            return Err(ConfigError::Ini {
                line: line_no,
                reason: "key=value before any [section] header".to_string(),
            });
        };
        let key = line[..eq].trim().to_string();
        let value = line[eq + 1..].trim().to_string();
        if key.is_empty() {
            return Err(ConfigError::Ini {
                line: line_no,
                reason: "empty key".to_string(),
            });
        }
        entries.push(RawEntry {
            section,
            key,
            value,
            line: line_no,
        });
    }

    Ok(entries)
}

/// Re-serialize entries back into INI text, grouped by section in
/// first-seen order. Used by the round-trip property test (§8 item 7).
pub fn serialize(entries: &[RawEntry]) -> String {
    let mut sections: Vec<&str> = Vec::new();
    for entry in entries {
        if !sections.contains(&entry.section.as_str()) {
            sections.push(&entry.section);
        }
    }

    let mut out = String::new();
    for section in sections {
        out.push('[');
        out.push_str(section);
        out.push_str("]\n");
        for entry in entries.iter().filter(|e| e.section == section) {
            out.push_str(&entry.key);
            out.push_str(" = ");
            out.push_str(&entry.value);
            out.push('\n');
        }
    }
    out
}
