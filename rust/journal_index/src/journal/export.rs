//! `journalctl --output=export` parser.
//!
//! Format, per field:
//!
//! ```text
//! NAME=text value\n                         text field
//! NAME\n<u64le size><size raw bytes>\n      sized (binary) field
//! \n                                        blank line: entry complete
//! ```
//!
//! The parser is a push-driven state machine: feed it chunks of any size and
//! it queues one event per field and one per entry separator. Sized values
//! may contain newlines.

use std::collections::VecDeque;

use super::error::ParseError;

/// Cap on the up-front allocation for a sized value; the length prefix is
/// untrusted, so larger values grow as their bytes actually arrive.
const MAX_PREALLOCATED_VALUE: u64 = 64 * 1024;

const SIZE_LEN: usize = 8;

/// One parse event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportEvent {
    Field { name: String, value: String },
    /// Blank separator line. `end` is the offset just past its `\n`.
    EntryComplete { end: u64 },
}

#[derive(Debug)]
enum State {
    /// Accumulating a field name into `scratch`.
    FieldName,
    /// Accumulating a text value into `scratch`.
    TextValue { name: String },
    /// Reading the 8-byte little-endian size of a sized value.
    Size {
        name: String,
        size: [u8; SIZE_LEN],
        filled: usize,
    },
    /// Copying `remaining` raw bytes into `scratch`.
    SizedValue { name: String, remaining: u64 },
    /// Expecting the `\n` that terminates a sized value.
    Terminator { name: String },
}

impl State {
    fn expecting(&self) -> &'static str {
        match self {
            State::FieldName => "field name",
            State::TextValue { .. } => "field text value",
            State::Size { .. } => "field size",
            State::SizedValue { .. } => "sized field value",
            State::Terminator { .. } => "newline after sized field value",
        }
    }
}

/// Streaming export-format parser.
#[derive(Debug)]
pub struct ExportParser {
    state: State,
    scratch: Vec<u8>,
    position: u64,
}

impl Default for ExportParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportParser {
    pub fn new() -> Self {
        ExportParser {
            state: State::FieldName,
            scratch: Vec::new(),
            position: 0,
        }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Feed a chunk, queueing every event it completes.
    pub fn push(&mut self, chunk: &[u8], out: &mut VecDeque<ExportEvent>) -> Result<(), ParseError> {
        let mut rest = chunk;
        while !rest.is_empty() {
            let used = self.step(rest, out)?;
            self.position += used as u64;
            rest = &rest[used..];
        }
        Ok(())
    }

    /// Signal end of input.
    ///
    /// Ending between fields, having read no part of a name, is graceful.
    /// Ending anywhere else means the export was truncated.
    pub fn finish(&mut self) -> Result<(), ParseError> {
        match self.state {
            State::FieldName if self.scratch.is_empty() => Ok(()),
            ref state => Err(ParseError::Truncated {
                offset: self.position,
                expecting: state.expecting(),
            }),
        }
    }

    /// Consume a prefix of `input` (at least one byte) in the current state.
    fn step(&mut self, input: &[u8], out: &mut VecDeque<ExportEvent>) -> Result<usize, ParseError> {
        match std::mem::replace(&mut self.state, State::FieldName) {
            State::FieldName => match memchr::memchr2(b'=', b'\n', input) {
                None => {
                    self.scratch.extend_from_slice(input);
                    Ok(input.len())
                }
                Some(at) => {
                    self.scratch.extend_from_slice(&input[..at]);
                    let name = self.take_scratch();
                    let used = at + 1;
                    if input[at] == b'=' {
                        self.state = State::TextValue { name };
                    } else if name.is_empty() {
                        out.push_back(ExportEvent::EntryComplete {
                            end: self.position + used as u64,
                        });
                    } else {
                        self.state = State::Size {
                            name,
                            size: [0; SIZE_LEN],
                            filled: 0,
                        };
                    }
                    Ok(used)
                }
            },
            State::TextValue { name } => match memchr::memchr(b'\n', input) {
                None => {
                    self.scratch.extend_from_slice(input);
                    self.state = State::TextValue { name };
                    Ok(input.len())
                }
                Some(at) => {
                    self.scratch.extend_from_slice(&input[..at]);
                    let value = self.take_scratch();
                    out.push_back(ExportEvent::Field { name, value });
                    Ok(at + 1)
                }
            },
            State::Size {
                name,
                mut size,
                filled,
            } => {
                let take = (SIZE_LEN - filled).min(input.len());
                size[filled..filled + take].copy_from_slice(&input[..take]);
                let filled = filled + take;
                self.state = if filled == SIZE_LEN {
                    let remaining = u64::from_le_bytes(size);
                    self.scratch.clear();
                    self.scratch
                        .reserve(remaining.min(MAX_PREALLOCATED_VALUE) as usize);
                    if remaining == 0 {
                        State::Terminator { name }
                    } else {
                        State::SizedValue { name, remaining }
                    }
                } else {
                    State::Size { name, size, filled }
                };
                Ok(take)
            }
            State::SizedValue { name, remaining } => {
                let take = remaining.min(input.len() as u64) as usize;
                self.scratch.extend_from_slice(&input[..take]);
                let remaining = remaining - take as u64;
                self.state = if remaining == 0 {
                    State::Terminator { name }
                } else {
                    State::SizedValue { name, remaining }
                };
                Ok(take)
            }
            State::Terminator { name } => {
                if input[0] != b'\n' {
                    return Err(ParseError::MissingNewline {
                        offset: self.position,
                        found: input[0],
                    });
                }
                let value = self.take_scratch();
                out.push_back(ExportEvent::Field { name, value });
                Ok(1)
            }
        }
    }

    fn take_scratch(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.scratch).into_owned();
        self.scratch.clear();
        text
    }
}

/// Parse a complete in-memory export into events.
pub fn parse_export(data: &[u8]) -> Result<Vec<ExportEvent>, ParseError> {
    let mut parser = ExportParser::new();
    let mut events = VecDeque::new();
    parser.push(data, &mut events)?;
    parser.finish()?;
    Ok(events.into())
}
