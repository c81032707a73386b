//! Journal sources: format detection, record splitting and entry
//! materialization for `journalctl --output=json` and `--output=export`.

pub mod detect;
pub mod entry;
pub mod error;
pub mod export;
pub mod json;
pub mod lines;
pub mod source;

pub use detect::{detect_format, JournalFormat};
pub use entry::{line_count, EntryMetadata, ExportFields, FieldSource, LogEntry, Priority};
pub use error::{EntryError, ParseError};
pub use export::{parse_export, ExportEvent, ExportParser};
pub use json::{JsonRecord, JsonRecordSplitter};
pub use lines::{Line, LineSplitter};
pub use source::{RawFields, RawRecord, RecordReader};
