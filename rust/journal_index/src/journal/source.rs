//! Pull-based record reader over an async byte source.

use std::collections::VecDeque;

use tokio::io::{AsyncRead, AsyncReadExt};

use super::detect::{detect_format, JournalFormat};
use super::entry::{ExportFields, LogEntry};
use super::error::{EntryError, ParseError};
use super::export::{ExportEvent, ExportParser};
use super::json::{JsonRecord, JsonRecordSplitter};

/// Fields of one raw record, before materialization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawFields {
    Json(serde_json::Value),
    Export(ExportFields),
}

/// One record and its half-open byte range in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub fields: RawFields,
    pub begin: u64,
    pub end: u64,
}

impl RawRecord {
    pub fn to_entry(&self) -> Result<LogEntry, EntryError> {
        match &self.fields {
            RawFields::Json(value) => LogEntry::from_json(value),
            RawFields::Export(fields) => LogEntry::from_fields(fields),
        }
    }
}

enum Splitter {
    Json(JsonRecordSplitter),
    Export {
        parser: ExportParser,
        events: VecDeque<ExportEvent>,
        fields: ExportFields,
        entry_begin: u64,
    },
}

/// Reads records one at a time from `R`, in source order.
///
/// The format is detected from the first byte. After a recoverable error
/// (a bad JSON line) the next call continues with the following record;
/// after any other error the reader is exhausted.
pub struct RecordReader<R> {
    reader: R,
    format: JournalFormat,
    splitter: Splitter,
    buf: Vec<u8>,
    ready: VecDeque<Result<RawRecord, ParseError>>,
    json_out: Vec<Result<JsonRecord, ParseError>>,
    bytes_read: u64,
    done: bool,
}

impl<R: AsyncRead + Unpin> RecordReader<R> {
    /// Read the first chunk of `reader` and detect its format.
    pub async fn open(mut reader: R, chunk_size: usize) -> Result<Self, ParseError> {
        let mut buf = vec![0u8; chunk_size.max(1)];
        let n = reader.read(&mut buf).await?;
        let format = detect_format(buf[..n].first().copied());
        let splitter = match format {
            JournalFormat::JsonLines => Splitter::Json(JsonRecordSplitter::new()),
            JournalFormat::Export => Splitter::Export {
                parser: ExportParser::new(),
                events: VecDeque::new(),
                fields: ExportFields::new(),
                entry_begin: 0,
            },
        };
        tracing::debug!(%format, first_chunk = n, "journal source opened");

        let mut this = RecordReader {
            reader,
            format,
            splitter,
            buf,
            ready: VecDeque::new(),
            json_out: Vec::new(),
            bytes_read: 0,
            done: false,
        };
        if n == 0 {
            this.finish();
        } else {
            this.feed(n);
        }
        Ok(this)
    }

    pub fn format(&self) -> JournalFormat {
        self.format
    }

    /// Bytes consumed from the source so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Next record, or `None` once the source is exhausted.
    pub async fn next_record(&mut self) -> Result<Option<RawRecord>, ParseError> {
        loop {
            if let Some(next) = self.ready.pop_front() {
                return next.map(Some);
            }
            if self.done {
                return Ok(None);
            }
            let n = match self.reader.read(&mut self.buf).await {
                Ok(n) => n,
                Err(err) => {
                    self.done = true;
                    return Err(err.into());
                }
            };
            if n == 0 {
                self.finish();
            } else {
                self.feed(n);
            }
        }
    }

    fn feed(&mut self, n: usize) {
        let chunk = &self.buf[..n];
        self.bytes_read += n as u64;
        match &mut self.splitter {
            Splitter::Json(splitter) => {
                splitter.push(chunk, &mut self.json_out);
                self.ready
                    .extend(self.json_out.drain(..).map(|r| r.map(json_record)));
            }
            Splitter::Export {
                parser,
                events,
                fields,
                entry_begin,
            } => {
                let pushed = parser.push(chunk, events);
                drain_export(events, fields, entry_begin, &mut self.ready);
                if let Err(err) = pushed {
                    self.ready.push_back(Err(err));
                    self.done = true;
                }
            }
        }
    }

    fn finish(&mut self) {
        self.done = true;
        match &mut self.splitter {
            Splitter::Json(splitter) => {
                splitter.finish(&mut self.json_out);
                self.ready
                    .extend(self.json_out.drain(..).map(|r| r.map(json_record)));
            }
            Splitter::Export {
                parser,
                fields,
                entry_begin,
                ..
            } => {
                if let Err(err) = parser.finish() {
                    self.ready.push_back(Err(err));
                } else if !fields.is_empty() {
                    // Last entry without a trailing blank line.
                    self.ready.push_back(Ok(RawRecord {
                        fields: RawFields::Export(std::mem::take(fields)),
                        begin: *entry_begin,
                        end: self.bytes_read,
                    }));
                }
            }
        }
    }
}

fn json_record(record: JsonRecord) -> RawRecord {
    RawRecord {
        fields: RawFields::Json(record.value),
        begin: record.begin,
        end: record.end,
    }
}

fn drain_export(
    events: &mut VecDeque<ExportEvent>,
    fields: &mut ExportFields,
    entry_begin: &mut u64,
    ready: &mut VecDeque<Result<RawRecord, ParseError>>,
) {
    for event in events.drain(..) {
        match event {
            ExportEvent::Field { name, value } => fields.push(name, value),
            ExportEvent::EntryComplete { end } => {
                // Repeated blank lines produce empty entries; skip them.
                if !fields.is_empty() {
                    ready.push_back(Ok(RawRecord {
                        fields: RawFields::Export(std::mem::take(fields)),
                        begin: *entry_begin,
                        end,
                    }));
                }
                *entry_begin = end;
            }
        }
    }
}
