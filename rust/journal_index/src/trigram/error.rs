//! Error types for the posting-list codec.

use thiserror::Error;

/// Violations of the delta + varint encoding contract.
///
/// None of these can occur while an index is built from a single sequential
/// pass; seeing one means an ordinal was reused or a byte store was cut short.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Value does not fit in the 31-bit payload.
    #[error("value {0} does not fit in a 31-bit varint payload")]
    ValueTooLarge(u32),

    /// Element is not strictly greater than its predecessor.
    #[error("elements must be strictly increasing: {next} follows {last}")]
    NotIncreasing { last: u32, next: u32 },

    /// Stream ended part-way through a 4-byte group.
    #[error("varint stream ended after {read} of 4 continuation bytes")]
    UnexpectedEof { read: usize },

    /// Running sum of decoded deltas left the u32 range.
    #[error("decoded running sum overflowed")]
    Overflow,
}
