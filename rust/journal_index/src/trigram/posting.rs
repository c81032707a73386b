//! Compressed posting lists.
//!
//! A posting list is the ascending set of entry ordinals containing one
//! trigram. Ordinals are stored as delta varints in a [`BlockBuffer`], which
//! trades random access for a much smaller footprint on trigrams that occur
//! in nearly every entry.

use tokio_util::sync::CancellationToken;

use super::blocks::{BlockBuffer, BlockSizing};
use super::error::CodecError;
use super::varint::{DeltaDecoder, DeltaEncoder};
use crate::error::Outcome;

/// Candidates examined between cancellation checks while intersecting.
const CANCEL_CHECK_INTERVAL: usize = 1024;

/// Compressed, append-only, strictly ascending set of ordinals.
#[derive(Debug, Clone)]
pub struct PostingList {
    encoder: DeltaEncoder,
    bytes: BlockBuffer,
    len: u32,
}

impl PostingList {
    pub fn new(sizing: BlockSizing) -> Self {
        PostingList {
            encoder: DeltaEncoder::new(),
            bytes: BlockBuffer::new(sizing),
            len: 0,
        }
    }

    /// Append an ordinal. Must be greater than the last appended ordinal.
    pub fn append(&mut self, ordinal: u32) -> Result<(), CodecError> {
        let encoded = self.encoder.push(ordinal)?;
        self.bytes.extend_from_slice(encoded.as_bytes());
        self.len += 1;
        Ok(())
    }

    /// Number of ordinals in this list.
    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Largest ordinal appended so far.
    pub fn last(&self) -> Option<u32> {
        self.encoder.last()
    }

    /// Encoded size in bytes.
    pub fn compressed_len(&self) -> usize {
        self.bytes.len()
    }

    /// Bytes reserved by the underlying block store.
    pub fn allocated(&self) -> usize {
        self.bytes.allocated()
    }

    /// Iterate ordinals in ascending order. Each call starts a fresh decode.
    pub fn iter(&self) -> PostingIter<'_> {
        PostingIter {
            inner: DeltaDecoder::new(Box::new(self.bytes.bytes())),
        }
    }

    pub fn to_vec(&self) -> Vec<u32> {
        self.iter().collect()
    }
}

impl Default for PostingList {
    fn default() -> Self {
        Self::new(BlockSizing::default())
    }
}

impl<'a> IntoIterator for &'a PostingList {
    type Item = u32;
    type IntoIter = PostingIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy ascending iterator over a [`PostingList`].
pub struct PostingIter<'a> {
    inner: DeltaDecoder<Box<dyn Iterator<Item = u8> + 'a>>,
}

impl Iterator for PostingIter<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        // The byte store is only ever written through `append`, which emits
        // whole varint groups, so decoding cannot fail.
        self.inner
            .next()
            .map(|r| r.expect("posting list holds only complete varint groups"))
    }
}

/// Intersect posting lists (AND).
///
/// Lists are visited smallest first: every ordinal of the smallest list is a
/// candidate, and each larger list is probed in turn with a forward-only
/// cursor, dropping the candidate as soon as one list lacks it. Returns an
/// empty result for an empty input.
pub fn intersect(lists: &[&PostingList], cancel: Option<&CancellationToken>) -> Outcome<Vec<u32>> {
    let mut sorted: Vec<&PostingList> = lists.to_vec();
    sorted.sort_by_key(|list| list.len());

    let Some((smallest, larger)) = sorted.split_first() else {
        return Outcome::Complete(Vec::new());
    };

    let mut cursors: Vec<_> = larger.iter().map(|list| list.iter().peekable()).collect();
    let mut result = Vec::new();

    'candidates: for (step, candidate) in smallest.iter().enumerate() {
        if step % CANCEL_CHECK_INTERVAL == 0 && cancel.is_some_and(|c| c.is_cancelled()) {
            return Outcome::Cancelled;
        }
        for cursor in cursors.iter_mut() {
            loop {
                match cursor.peek() {
                    Some(&ordinal) if ordinal < candidate => {
                        cursor.next();
                    }
                    Some(&ordinal) if ordinal == candidate => break,
                    Some(_) => continue 'candidates,
                    // A list ran out: nothing later can be in every list.
                    None => break 'candidates,
                }
            }
        }
        result.push(candidate);
    }

    Outcome::Complete(result)
}
