//! Errors raised while splitting and materializing journal records.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A JSON-lines record is not valid JSON.
    #[error("invalid JSON record at bytes {begin}..{end}: {source}")]
    InvalidJson {
        begin: u64,
        end: u64,
        #[source]
        source: serde_json::Error,
    },

    /// Export stream ended where more bytes were required.
    #[error("export stream truncated at byte {offset} while reading {expecting}")]
    Truncated {
        offset: u64,
        expecting: &'static str,
    },

    /// A sized export field is not followed by its terminating newline.
    #[error("expected newline after sized field value at byte {offset}, found {found:#04x}")]
    MissingNewline { offset: u64, found: u8 },
}

impl ParseError {
    /// Whether the reader can continue with the next record after this error.
    ///
    /// Only a bad JSON line is self-contained; the export format cannot be
    /// resynchronised once a field is truncated.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ParseError::InvalidJson { .. })
    }
}

/// A record that cannot be turned into a [`LogEntry`](super::entry::LogEntry).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryError {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("missing __REALTIME_TIMESTAMP")]
    MissingTimestamp,

    #[error("__REALTIME_TIMESTAMP is not a number: {0:?}")]
    InvalidTimestamp(String),

    #[error("__REALTIME_TIMESTAMP {0} is out of range")]
    TimestampOutOfRange(u64),
}
