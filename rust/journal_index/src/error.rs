//! Crate-level error and outcome types.

use thiserror::Error;

use crate::journal::error::{EntryError, ParseError};
use crate::trigram::error::CodecError;

/// Result of an operation that honours a cancellation token.
///
/// Cancellation is not a failure: `Cancelled` carries no partial result and
/// is distinct from a completed operation that found nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Outcome<T> {
    Complete(T),
    Cancelled,
}

impl<T> Outcome<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }

    /// The completed value, or `None` if cancelled.
    pub fn complete(self) -> Option<T> {
        match self {
            Outcome::Complete(value) => Some(value),
            Outcome::Cancelled => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Complete(value) => Outcome::Complete(f(value)),
            Outcome::Cancelled => Outcome::Cancelled,
        }
    }
}

/// Errors from building or querying a [`LogIndex`](crate::LogIndex).
#[derive(Debug, Error)]
pub enum IndexError {
    /// Source could not be split into records.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A record could not be turned into a log entry.
    #[error("invalid entry at bytes {begin}..{end}: {source}")]
    Entry {
        begin: u64,
        end: u64,
        #[source]
        source: EntryError,
    },

    /// Posting-list invariant broken while indexing.
    #[error("index codec error: {0}")]
    Codec(#[from] CodecError),

    /// Ordinal outside `[0, count)`.
    #[error("entry {ordinal} is not in [0, {count})")]
    OutOfRange { ordinal: u32, count: u32 },

    /// A search candidate has no stored entry.
    #[error("search candidate {0} has no stored entry")]
    MissingCandidate(u32),

    /// Source holds more entries than an ordinal can address.
    #[error("source holds more than {0} entries")]
    TooManyEntries(u32),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// No index has been loaded into the session yet.
    #[error("no index loaded")]
    NotLoaded,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejected [`IndexConfig`](crate::IndexConfig) values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("posting_first_block ({first}) exceeds posting_block_size ({max})")]
    BlockSizes { first: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, IndexError>;
