//! `journal_index`: in-memory trigram index over journalctl exports.
//!
//! Reads `journalctl --output=json` or `--output=export` from any async
//! byte source, materializes each record into a [`LogEntry`], and answers
//! case-insensitive substring queries with the ordinals of matching entries.
//!
//! Modules:
//! - `journal`  : format detection, record splitting, entry materialization
//! - `trigram`  : compressed posting lists and the trigram index
//! - `index`    : build pipeline, read API, search and session supersession
//! - `search`   : normalization, verification and match positions
//! - `config`   : build and search tunables
//! - `progress` : throttled progress reporting

pub mod config;
pub mod error;
pub mod index;
pub mod journal;
pub mod progress;
pub mod search;
pub mod trigram;

pub use config::{IndexConfig, IndexConfigBuilder, MalformedEntryPolicy};
pub use error::{ConfigError, IndexError, Outcome, Result};
pub use index::{build, build_from_path, IndexSession, IndexStats, LogIndex, LogIndexBuilder};
pub use journal::{EntryMetadata, JournalFormat, LogEntry, Priority};
pub use progress::ProgressThrottle;
pub use search::find_all_matches;
