//! The `Key: value` paragraph grammar shared by the status database and
//! source-control-file-shaped metadata (`spec.md` §6):
//!
//! ```text
//! record   := field (LF field)* LF LF
//! field    := KEY ': ' value (LF ' ' continuation)*
//! ```
//!
//! Unknown fields round-trip verbatim so forward-compatible readers never
//! lose data they don't understand.

use crate::error::{Error, ErrorCode};
use crate::Result;

/// An ordered sequence of `Key: value` fields, preserving duplicate and
/// unrecognized keys exactly as read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    fields: Vec<(String, String)>,
}

impl Paragraph {
    /// An empty paragraph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The value of the first field named `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All values for fields named `key`, in file order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> {
        self.fields
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Append a field, keeping any existing field with the same key.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    /// Replace every existing field named `key` with a single new value,
    /// appending if none existed.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        self.fields.retain(|(k, _)| k != &key);
        self.fields.push((key, value.into()));
        self
    }

    /// Iterate fields in file order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Whether this paragraph has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Render to the on-disk text form (trailing blank line included).
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.fields {
            out.push_str(key);
            out.push_str(": ");
            let mut lines = value.split('\n');
            if let Some(first) = lines.next() {
                out.push_str(first);
            }
            out.push('\n');
            for cont in lines {
                out.push(' ');
                out.push_str(cont);
                out.push('\n');
            }
        }
        out.push('\n');
        out
    }

    /// Parse every record in `text`, separated by blank lines.
    pub fn parse_all(text: &str) -> Result<Vec<Self>> {
        let mut records = Vec::new();
        let mut current = Self::new();
        let mut pending_key: Option<String> = None;

        for raw_line in text.split('\n') {
            let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
            if line.is_empty() {
                if !current.is_empty() {
                    records.push(std::mem::take(&mut current));
                }
                pending_key = None;
                continue;
            }
            if let Some(rest) = line.strip_prefix(' ') {
                let Some(key) = pending_key.clone() else {
                    return Err(Error::Paragraph {
                        code: ErrorCode::IoError,
                        message: format!("continuation line without a preceding field: {line:?}"),
                    });
                };
                if let Some((_, last_value)) = current.fields.iter_mut().rev().find(|(k, _)| *k == key) {
                    last_value.push('\n');
                    last_value.push_str(rest);
                }
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                return Err(Error::Paragraph {
                    code: ErrorCode::IoError,
                    message: format!("field line missing ':': {line:?}"),
                });
            };
            let key = key.trim().to_string();
            let value = value.strip_prefix(' ').unwrap_or(value);
            current.push(key.clone(), value);
            pending_key = Some(key);
        }
        if !current.is_empty() {
            records.push(current);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_single_record() {
        let mut p = Paragraph::new();
        p.push("Package", "zlib").push("Version", "1.3").push("Architecture", "x64-linux");
        let text = p.to_text();
        let parsed = Paragraph::parse_all(&text).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0], p);
    }

    #[test]
    fn continuation_lines_are_joined_with_newline() {
        let text = "Description: first line\n second line\n\n";
        let parsed = Paragraph::parse_all(text).unwrap();
        assert_eq!(parsed[0].get("Description"), Some("first line\nsecond line"));
    }

    #[test]
    fn blank_line_separates_records() {
        let text = "Package: a\n\nPackage: b\n\n";
        let parsed = Paragraph::parse_all(text).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].get("Package"), Some("a"));
        assert_eq!(parsed[1].get("Package"), Some("b"));
    }

    #[test]
    fn unknown_fields_round_trip_verbatim() {
        let text = "Package: a\nX-Custom-Field: keep-me\n\n";
        let parsed = Paragraph::parse_all(text).unwrap();
        assert_eq!(parsed[0].to_text(), text);
    }
}
