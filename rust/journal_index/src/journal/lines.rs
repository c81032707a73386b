//! Newline splitting with absolute byte offsets.

use std::collections::VecDeque;

/// One line of the source, without its trailing `\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub bytes: Vec<u8>,
    /// Offset of the first byte of the line.
    pub begin: u64,
    /// Offset one past the last byte of the line (the `\n` itself, if any).
    pub end: u64,
}

/// Splits a chunked byte stream on `\n`.
///
/// Chunk boundaries need not align with lines; a partial line is buffered
/// until its newline (or end of input) arrives.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
    pending_begin: u64,
    consumed: u64,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, queueing every line it completes.
    pub fn push(&mut self, chunk: &[u8], out: &mut VecDeque<Line>) {
        let mut start = 0;
        for newline in memchr::memchr_iter(b'\n', chunk) {
            let mut bytes = std::mem::take(&mut self.pending);
            bytes.extend_from_slice(&chunk[start..newline]);
            out.push_back(Line {
                bytes,
                begin: self.pending_begin,
                end: self.consumed + newline as u64,
            });
            start = newline + 1;
            self.pending_begin = self.consumed + start as u64;
        }
        self.pending.extend_from_slice(&chunk[start..]);
        self.consumed += chunk.len() as u64;
    }

    /// Flush the final line. It may be empty if the input ended with `\n`.
    pub fn finish(&mut self) -> Line {
        Line {
            bytes: std::mem::take(&mut self.pending),
            begin: self.pending_begin,
            end: self.consumed,
        }
    }

    /// Total bytes fed so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }
}
