//! Delta + varint codec for strictly increasing ordinals.
//!
//! Each element is stored as its difference from the previous element (the
//! first element is stored as itself). A difference is written as:
//!
//! ```text
//! value <= 127   1 byte    [value << 1]                 low bit 0
//! otherwise      4 bytes   ((value << 1) | 1) as u32le  low bit 1
//! ```
//!
//! The wide form is the 31-bit payload split into 7-bit-aligned bytes, each
//! carrying the top bit of the byte before it. Reading it back as a
//! little-endian u32 and shifting right by one recovers the value.

use super::error::CodecError;

/// Largest value accepted by the encoder (`2^31 - 2`).
pub const MAX_VALUE: u32 = 0x7fff_fffe;

/// Largest value stored in the single-byte form.
const SINGLE_BYTE_MAX: u32 = 0x7f;

/// Bytes in the wide form.
const WIDE_LEN: usize = 4;

/// One encoded value: either 1 or 4 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Varint {
    buf: [u8; WIDE_LEN],
    len: u8,
}

impl Varint {
    /// Encode a single value.
    pub fn encode(value: u32) -> Result<Self, CodecError> {
        if value > MAX_VALUE {
            return Err(CodecError::ValueTooLarge(value));
        }
        if value <= SINGLE_BYTE_MAX {
            return Ok(Varint {
                buf: [(value as u8) << 1, 0, 0, 0],
                len: 1,
            });
        }
        // value < 2^31 - 1, so the shift cannot drop a set bit.
        let word = (value << 1) | 1;
        Ok(Varint {
            buf: word.to_le_bytes(),
            len: WIDE_LEN as u8,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len as usize]
    }
}

/// Stateful encoder that turns ordinals into deltas.
#[derive(Debug, Clone, Default)]
pub struct DeltaEncoder {
    last: Option<u32>,
}

impl DeltaEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last element accepted, if any.
    pub fn last(&self) -> Option<u32> {
        self.last
    }

    /// Validate `element` against the previous one and encode its delta.
    ///
    /// State is only advanced when encoding succeeds.
    pub fn push(&mut self, element: u32) -> Result<Varint, CodecError> {
        let delta = match self.last {
            None => element,
            Some(last) if element > last => element - last,
            Some(last) => {
                return Err(CodecError::NotIncreasing {
                    last,
                    next: element,
                })
            }
        };
        if element > MAX_VALUE {
            return Err(CodecError::ValueTooLarge(element));
        }
        let encoded = Varint::encode(delta)?;
        self.last = Some(element);
        Ok(encoded)
    }
}

/// Decodes a byte stream of varints. Yields raw (delta) values.
///
/// Fuses after the first error.
#[derive(Debug, Clone)]
pub struct VarintDecoder<I> {
    bytes: I,
    failed: bool,
}

impl<I: Iterator<Item = u8>> VarintDecoder<I> {
    pub fn new(bytes: I) -> Self {
        VarintDecoder {
            bytes,
            failed: false,
        }
    }
}

impl<I: Iterator<Item = u8>> Iterator for VarintDecoder<I> {
    type Item = Result<u32, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let first = self.bytes.next()?;
        if first & 1 == 0 {
            return Some(Ok(u32::from(first >> 1)));
        }

        let mut word = [first, 0, 0, 0];
        for (read, slot) in word.iter_mut().enumerate().skip(1) {
            match self.bytes.next() {
                Some(byte) => *slot = byte,
                None => {
                    self.failed = true;
                    return Some(Err(CodecError::UnexpectedEof { read }));
                }
            }
        }
        Some(Ok(u32::from_le_bytes(word) >> 1))
    }
}

/// Decodes a delta stream back into the original ascending elements.
#[derive(Debug, Clone)]
pub struct DeltaDecoder<I> {
    inner: VarintDecoder<I>,
    sum: u32,
}

impl<I: Iterator<Item = u8>> DeltaDecoder<I> {
    pub fn new(bytes: I) -> Self {
        DeltaDecoder {
            inner: VarintDecoder::new(bytes),
            sum: 0,
        }
    }
}

impl<I: Iterator<Item = u8>> Iterator for DeltaDecoder<I> {
    type Item = Result<u32, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        let delta = match self.inner.next()? {
            Ok(delta) => delta,
            Err(e) => return Some(Err(e)),
        };
        match self.sum.checked_add(delta) {
            Some(sum) => {
                self.sum = sum;
                Some(Ok(sum))
            }
            None => {
                self.inner.failed = true;
                Some(Err(CodecError::Overflow))
            }
        }
    }
}

/// Encode a strictly increasing sequence into a fresh byte vector.
pub fn encode_sequence(elements: &[u32]) -> Result<Vec<u8>, CodecError> {
    let mut encoder = DeltaEncoder::new();
    let mut out = Vec::with_capacity(elements.len());
    for &element in elements {
        out.extend_from_slice(encoder.push(element)?.as_bytes());
    }
    Ok(out)
}

/// Decode a byte slice produced by [`encode_sequence`].
pub fn decode_sequence(bytes: &[u8]) -> Result<Vec<u32>, CodecError> {
    DeltaDecoder::new(bytes.iter().copied()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_single_byte_form() {
        assert_eq!(Varint::encode(0).unwrap().as_bytes(), &[0]);
        assert_eq!(Varint::encode(1).unwrap().as_bytes(), &[2]);
        assert_eq!(Varint::encode(127).unwrap().as_bytes(), &[254]);
    }

    #[test]
    fn test_wide_form_bit_layout() {
        // 128 = 0b1000_0000: payload0 = 0x80, payload1 = 0.
        // byte0 = (0x80 << 1) | 1 = 0x01 (truncated), byte1 = 0 << 1 | (0x80 >> 7) = 1.
        assert_eq!(Varint::encode(128).unwrap().as_bytes(), &[0x01, 0x01, 0x00, 0x00]);
        let max = Varint::encode(MAX_VALUE).unwrap();
        assert_eq!(max.as_bytes(), &[0xfd, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn test_rejects_values_at_ceiling() {
        assert_eq!(
            Varint::encode(0x7fff_ffff),
            Err(CodecError::ValueTooLarge(0x7fff_ffff))
        );
        assert!(Varint::encode(u32::MAX).is_err());
    }

    #[test]
    fn test_delta_encoder_rejects_repeats_and_decreases() {
        let mut encoder = DeltaEncoder::new();
        encoder.push(5).unwrap();
        assert_eq!(
            encoder.push(5),
            Err(CodecError::NotIncreasing { last: 5, next: 5 })
        );
        assert_eq!(
            encoder.push(4),
            Err(CodecError::NotIncreasing { last: 5, next: 4 })
        );
        // Failed pushes leave state untouched.
        assert_eq!(encoder.last(), Some(5));
        encoder.push(6).unwrap();
    }

    #[test]
    fn test_first_element_zero_is_allowed() {
        let bytes = encode_sequence(&[0, 1, 2]).unwrap();
        assert_eq!(decode_sequence(&bytes).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_truncated_group_is_error() {
        let mut bytes = encode_sequence(&[3, 10_000]).unwrap();
        bytes.pop();
        let decoded: Vec<_> = DeltaDecoder::new(bytes.iter().copied()).collect();
        assert_eq!(decoded[0], Ok(3));
        assert_eq!(decoded[1], Err(CodecError::UnexpectedEof { read: 3 }));
        assert_eq!(decoded.len(), 2);
    }

    #[test]
    fn test_decode_empty_stream() {
        assert!(decode_sequence(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_mixed_widths() {
        let input = [123, 130, 9999, 10050, 2_000_000_000];
        let bytes = encode_sequence(&input).unwrap();
        // 123 -> 1 byte, 7 -> 1, 9869 -> 4, 51 -> 1, big -> 4
        assert_eq!(bytes.len(), 11);
        assert_eq!(decode_sequence(&bytes).unwrap(), input);
    }

    proptest! {
        #[test]
        fn prop_roundtrip_increasing(
            start in 0u32..1_000_000,
            gaps in prop::collection::vec(1u32..5_000_000, 0..300)
        ) {
            let mut input = vec![start];
            for gap in gaps {
                let next = input.last().unwrap().saturating_add(gap);
                if next > MAX_VALUE {
                    break;
                }
                input.push(next);
            }
            let bytes = encode_sequence(&input).unwrap();
            prop_assert_eq!(decode_sequence(&bytes).unwrap(), input);
        }
    }
}
