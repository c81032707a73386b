//! Log entry materialization.
//!
//! Converts a raw record (JSON object or export fields) into a typed
//! [`LogEntry`]. Only `__REALTIME_TIMESTAMP` is mandatory; every other field
//! maps to an empty value when absent.

use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use super::error::EntryError;

pub const FIELD_REALTIME_TIMESTAMP: &str = "__REALTIME_TIMESTAMP";
pub const FIELD_PRIORITY: &str = "PRIORITY";
pub const FIELD_SYSTEMD_UNIT: &str = "_SYSTEMD_UNIT";
pub const FIELD_SYSLOG_IDENTIFIER: &str = "SYSLOG_IDENTIFIER";
pub const FIELD_MESSAGE: &str = "MESSAGE";

/// Syslog severity, 0 (emerg) through 7 (debug).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Priority(u8);

impl Priority {
    const NAMES: [&'static str; 8] = [
        "emerg", "alert", "crit", "err", "warning", "notice", "info", "debug",
    ];

    pub fn new(level: u8) -> Option<Self> {
        (level <= 7).then_some(Priority(level))
    }

    pub fn parse(s: &str) -> Option<Self> {
        s.trim().parse::<u8>().ok().and_then(Self::new)
    }

    pub fn level(self) -> u8 {
        self.0
    }

    /// Syslog keyword for this level.
    pub fn name(self) -> &'static str {
        Self::NAMES[self.0 as usize]
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One normalized journal entry. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub priority: Option<Priority>,
    pub unit: Option<String>,
    pub syslog_identifier: Option<String>,
    /// May contain embedded newlines. Empty when the record has no message.
    pub message: String,
}

/// Per-entry bookkeeping, indexed by the same ordinal as the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntryMetadata {
    /// Visual lines in the message; always at least 1.
    pub line_count: u32,
    /// Half-open byte range of the raw record in the source.
    pub start_byte: u64,
    pub end_byte: u64,
}

/// Number of newline-separated lines in `message`.
pub fn line_count(message: &str) -> u32 {
    let newlines = memchr::memchr_iter(b'\n', message.as_bytes()).count();
    u32::try_from(newlines).unwrap_or(u32::MAX - 1) + 1
}

/// Read access to a record's named fields.
pub trait FieldSource {
    /// Text value of `name`, if present.
    fn field(&self, name: &str) -> Option<Cow<'_, str>>;
}

impl FieldSource for Map<String, Value> {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        self.get(name).and_then(json_field_text)
    }
}

/// Fields of one export-format entry, in stream order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportFields {
    fields: Vec<(String, String)>,
}

impl ExportFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: String, value: String) {
        self.fields.push((name, value));
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl FieldSource for ExportFields {
    /// First occurrence wins when a field repeats.
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| Cow::Borrowed(v.as_str()))
    }
}

/// Text of one `journalctl --output=json` field value.
///
/// journalctl writes strings, arrays of byte values for non-UTF-8 or binary
/// data, and arrays of values when a field repeats (first one wins here).
fn json_field_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s)),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        Value::Array(items) => {
            if let Some(bytes) = as_byte_array(items) {
                return Some(Cow::Owned(String::from_utf8_lossy(&bytes).into_owned()));
            }
            items.first().and_then(json_field_text)
        }
        Value::Null | Value::Object(_) => None,
    }
}

fn as_byte_array(items: &[Value]) -> Option<Vec<u8>> {
    if items.is_empty() {
        return None;
    }
    items
        .iter()
        .map(|item| item.as_u64().and_then(|n| u8::try_from(n).ok()))
        .collect()
}

impl LogEntry {
    /// Build an entry from any field source.
    pub fn from_fields(fields: &impl FieldSource) -> Result<Self, EntryError> {
        let raw_timestamp = fields
            .field(FIELD_REALTIME_TIMESTAMP)
            .ok_or(EntryError::MissingTimestamp)?;
        let micros: u64 = raw_timestamp
            .trim()
            .parse()
            .map_err(|_| EntryError::InvalidTimestamp(raw_timestamp.to_string()))?;
        let timestamp = i64::try_from(micros)
            .ok()
            .and_then(DateTime::from_timestamp_micros)
            .ok_or(EntryError::TimestampOutOfRange(micros))?;

        Ok(LogEntry {
            timestamp,
            priority: fields.field(FIELD_PRIORITY).and_then(|p| Priority::parse(&p)),
            unit: fields.field(FIELD_SYSTEMD_UNIT).map(Cow::into_owned),
            syslog_identifier: fields.field(FIELD_SYSLOG_IDENTIFIER).map(Cow::into_owned),
            message: fields
                .field(FIELD_MESSAGE)
                .map(Cow::into_owned)
                .unwrap_or_default(),
        })
    }

    /// Build an entry from a parsed JSON line.
    pub fn from_json(value: &Value) -> Result<Self, EntryError> {
        match value {
            Value::Object(map) => Self::from_fields(map),
            _ => Err(EntryError::NotAnObject),
        }
    }

    /// Microseconds since the Unix epoch.
    pub fn timestamp_micros(&self) -> i64 {
        self.timestamp.timestamp_micros()
    }

    pub fn line_count(&self) -> u32 {
        line_count(&self.message)
    }
}
