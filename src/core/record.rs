//! Line-oriented secret file parsing and rewriting.
//!
//! A record is an ordered sequence of blank lines, `#` comments, and
//! `KEY=VALUE` entries. Comments and blanks survive every rewrite verbatim;
//! only the mutated entry line changes. Parsing either fully succeeds or
//! fails — a partial record never escapes this module.

use std::path::Path;

use tracing::debug;

use crate::core::atomic::write_atomic;
use crate::core::constants::{ENC_PREFIX, VAULT_PREFIX};
use crate::core::lockfile::with_lock;
use crate::error::{Error, FileError, Result};

/// One line of a record file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// A line that is empty or whitespace-only, kept verbatim.
    Blank(String),
    /// A `#` comment, kept verbatim.
    Comment(String),
    /// A `KEY=VALUE` entry with its 1-based source line number.
    Entry {
        key: String,
        value: String,
        line: usize,
    },
}

/// How a raw value should be interpreted.
///
/// The two prefixes are mutually exclusive at this layer; a decrypted
/// ciphertext may still turn out to be a vault reference, which callers
/// check only after decryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind<'a> {
    Plain(&'a str),
    Encrypted(&'a str),
    VaultRef(&'a str),
}

/// Classify a raw value by its prefix.
pub fn classify(value: &str) -> ValueKind<'_> {
    if let Some(blob) = value.strip_prefix(ENC_PREFIX) {
        ValueKind::Encrypted(blob)
    } else if let Some(name) = value.strip_prefix(VAULT_PREFIX) {
        ValueKind::VaultRef(name)
    } else {
        ValueKind::Plain(value)
    }
}

/// A parsed record file.
#[derive(Debug, Clone, Default)]
pub struct Record {
    lines: Vec<Line>,
}

impl Record {
    /// Parse a record file from disk.
    ///
    /// A missing file is an empty record, not an error. A leading byte-order
    /// mark is stripped; CRLF line endings are tolerated (and normalized to
    /// LF on rewrite).
    ///
    /// # Errors
    ///
    /// `Error::Parse` on a structural violation (missing `=`, empty key,
    /// duplicate key); `Error::Validation` when a structurally sound key
    /// breaks the naming policy; `FileError` on unreadable files.
    pub fn parse(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "record file missing, treating as empty");
                return Ok(Self::default());
            }
            Err(e) => return Err(FileError::io(path, e).into()),
        };

        let record = Self::parse_str(&contents)?;
        debug!(path = %path.display(), entries = record.len(), "record parsed");
        Ok(record)
    }

    /// Parse record content from a string.
    pub fn parse_str(contents: &str) -> Result<Self> {
        let contents = contents.strip_prefix('\u{feff}').unwrap_or(contents);
        let mut lines = Vec::new();
        let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();

        for (idx, raw) in contents.lines().enumerate() {
            let raw = raw.strip_suffix('\r').unwrap_or(raw);
            let lineno = idx + 1;
            let trimmed = raw.trim();

            if trimmed.is_empty() {
                lines.push(Line::Blank(raw.to_string()));
                continue;
            }
            if trimmed.starts_with('#') {
                lines.push(Line::Comment(raw.to_string()));
                continue;
            }

            let Some((key, value)) = raw.split_once('=') else {
                return Err(parse_error(lineno, raw, "missing '='"));
            };
            let key = key.trim();
            if key.is_empty() {
                return Err(parse_error(lineno, raw, "empty key"));
            }
            if !seen.insert(key.to_string()) {
                return Err(parse_error(lineno, raw, &format!("duplicate key {key:?}")));
            }

            lines.push(Line::Entry {
                key: key.to_string(),
                value: value.trim().to_string(),
                line: lineno,
            });
        }

        let record = Self { lines };
        record.validate_keys()?;
        Ok(record)
    }

    /// Policy pass: keys are uppercase letters, digits, and underscore.
    ///
    /// Deliberately a separate failure class from [`Error::Parse`]: the file
    /// is structurally sound, the key name just breaks naming policy.
    fn validate_keys(&self) -> Result<()> {
        for line in &self.lines {
            if let Line::Entry { key, .. } = line {
                if let Some(bad) = key
                    .chars()
                    .find(|c| !c.is_ascii_uppercase() && !c.is_ascii_digit() && *c != '_')
                {
                    return Err(Error::Validation {
                        key: key.clone(),
                        reason: format!(
                            "invalid character {bad:?}; only A-Z, 0-9, and underscore are allowed"
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Serialize back to file content.
    ///
    /// Non-entry lines round-trip verbatim; output is LF-joined with a
    /// trailing newline.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Blank(raw) | Line::Comment(raw) => out.push_str(raw),
                Line::Entry { key, value, .. } => {
                    out.push_str(key);
                    out.push('=');
                    out.push_str(value);
                }
            }
            out.push('\n');
        }
        out
    }

    /// Look up the raw value for a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().find_map(|line| match line {
            Line::Entry { key: k, value, .. } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    /// All entry keys in file order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|line| match line {
            Line::Entry { key, .. } => Some(key.as_str()),
            _ => None,
        })
    }

    /// All lines, in order.
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.keys().count()
    }

    /// Whether the record holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn upsert(&mut self, key: &str, value: &str) {
        for line in &mut self.lines {
            if let Line::Entry { key: k, value: v, .. } = line {
                if k == key {
                    *v = value.to_string();
                    return;
                }
            }
        }
        let line = self.lines.len() + 1;
        self.lines.push(Line::Entry {
            key: key.to_string(),
            value: value.to_string(),
            line,
        });
    }

    fn drop_key(&mut self, key: &str) -> bool {
        let before = self.lines.len();
        self.lines
            .retain(|line| !matches!(line, Line::Entry { key: k, .. } if k == key));
        self.lines.len() != before
    }
}

fn parse_error(line: usize, raw: &str, reason: &str) -> Error {
    Error::Parse {
        line,
        raw: raw.to_string(),
        reason: reason.to_string(),
    }
}

/// Set `key` to `value` in the record at `path`.
///
/// Runs under the path's lock: the whole file is re-read, the matching entry
/// rewritten in place (or appended), and the result replaced atomically.
/// Every other line is preserved verbatim.
///
/// # Errors
///
/// `Error::Validation` when the key breaks naming policy or the value
/// carries a line break. The format is line-oriented: a value containing
/// `\n` or `\r` would serialize as extra lines and smuggle phantom entries
/// into the store.
pub fn set(path: &Path, key: &str, value: &str) -> Result<()> {
    validate_value(key, value)?;
    with_lock(path, || {
        let mut record = Record::parse(path)?;
        record.upsert(key, value);
        record.validate_keys()?;
        write_atomic(path, &record.serialize())
    })
}

fn validate_value(key: &str, value: &str) -> Result<()> {
    if value.contains('\n') || value.contains('\r') {
        return Err(Error::Validation {
            key: key.to_string(),
            reason: "value must not contain line breaks".to_string(),
        });
    }
    Ok(())
}

/// Remove `key` from the record at `path`.
///
/// # Errors
///
/// `Error::SecretNotFound` when the key is not present.
pub fn remove(path: &Path, key: &str) -> Result<()> {
    with_lock(path, || {
        let mut record = Record::parse(path)?;
        if !record.drop_key(key) {
            return Err(Error::SecretNotFound(key.to_string()));
        }
        write_atomic(path, &record.serialize())
    })
}
