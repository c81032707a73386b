//! `journalctl --output=json` record splitting.

use std::collections::VecDeque;

use serde_json::Value;

use super::error::ParseError;
use super::lines::{Line, LineSplitter};

/// One parsed JSON line and its byte range in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRecord {
    pub value: Value,
    pub begin: u64,
    pub end: u64,
}

/// Parse one line. Returns `None` for an empty line.
pub fn parse_line(line: &Line) -> Option<Result<JsonRecord, ParseError>> {
    if line.bytes.is_empty() {
        return None;
    }
    Some(
        serde_json::from_slice(&line.bytes)
            .map(|value| JsonRecord {
                value,
                begin: line.begin,
                end: line.end,
            })
            .map_err(|source| ParseError::InvalidJson {
                begin: line.begin,
                end: line.end,
                source,
            }),
    )
}

/// Two-stage splitter: newline split, then JSON parse of each non-empty line.
///
/// Empty lines are skipped, so input with or without a trailing newline
/// yields the same records.
#[derive(Debug, Default)]
pub struct JsonRecordSplitter {
    lines: LineSplitter,
    queue: VecDeque<Line>,
}

impl JsonRecordSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8], out: &mut Vec<Result<JsonRecord, ParseError>>) {
        self.lines.push(chunk, &mut self.queue);
        self.drain(out);
    }

    pub fn finish(&mut self, out: &mut Vec<Result<JsonRecord, ParseError>>) {
        let last = self.lines.finish();
        self.queue.push_back(last);
        self.drain(out);
    }

    fn drain(&mut self, out: &mut Vec<Result<JsonRecord, ParseError>>) {
        out.extend(self.queue.drain(..).filter_map(|line| parse_line(&line)));
    }
}
