//! Source format detection.

use std::fmt;

/// Wire format of a journal export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalFormat {
    /// `journalctl --output=json`: one JSON object per line.
    JsonLines,
    /// `journalctl --output=export`: field/value records separated by blank lines.
    Export,
}

impl fmt::Display for JournalFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JournalFormat::JsonLines => write!(f, "json"),
            JournalFormat::Export => write!(f, "export"),
        }
    }
}

/// Choose a format from the first byte of the source.
///
/// Empty input is treated as JSON-lines; both parsers yield no records for it.
pub fn detect_format(first_byte: Option<u8>) -> JournalFormat {
    match first_byte {
        None | Some(b'{') => JournalFormat::JsonLines,
        Some(_) => JournalFormat::Export,
    }
}
