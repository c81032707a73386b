//! Append-only byte store made of fixed-capacity blocks.
//!
//! Blocks are never reallocated once created, so appending is amortized O(1)
//! without ever copying a large contiguous buffer. Block sizes start at
//! `first_block` and double per allocation until they reach `max_block`.

/// Block sizing policy for a [`BlockBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSizing {
    pub first_block: usize,
    pub max_block: usize,
}

impl BlockSizing {
    pub const DEFAULT_FIRST_BLOCK: usize = 64;
    pub const DEFAULT_MAX_BLOCK: usize = 1024 * 1024;

    fn next_size(&self, previous: Option<usize>) -> usize {
        let size = match previous {
            None => self.first_block,
            Some(prev) => prev.saturating_mul(2),
        };
        size.clamp(1, self.max_block.max(1))
    }
}

impl Default for BlockSizing {
    fn default() -> Self {
        BlockSizing {
            first_block: Self::DEFAULT_FIRST_BLOCK,
            max_block: Self::DEFAULT_MAX_BLOCK,
        }
    }
}

/// Growable byte sequence stored as a chain of blocks in allocation order.
#[derive(Debug, Clone)]
pub struct BlockBuffer {
    blocks: Vec<Vec<u8>>,
    sizing: BlockSizing,
    len: usize,
}

impl BlockBuffer {
    pub fn new(sizing: BlockSizing) -> Self {
        BlockBuffer {
            blocks: Vec::new(),
            sizing,
            len: 0,
        }
    }

    /// Append one byte.
    pub fn push(&mut self, byte: u8) {
        self.tail_with_room().push(byte);
        self.len += 1;
    }

    /// Append a run of bytes, spilling into new blocks as needed.
    pub fn extend_from_slice(&mut self, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            let tail = self.tail_with_room();
            let room = tail.capacity() - tail.len();
            let take = room.min(bytes.len());
            tail.extend_from_slice(&bytes[..take]);
            self.len += take;
            bytes = &bytes[take..];
        }
    }

    /// Number of bytes stored.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes reserved across all blocks.
    pub fn allocated(&self) -> usize {
        self.blocks.iter().map(Vec::capacity).sum()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Iterate every stored byte, block by block.
    pub fn bytes(&self) -> impl Iterator<Item = u8> + Clone + '_ {
        self.blocks.iter().flat_map(|block| block.iter().copied())
    }

    /// Last block, allocating a new one if it is full.
    fn tail_with_room(&mut self) -> &mut Vec<u8> {
        let full = match self.blocks.last() {
            Some(block) => block.len() == block.capacity(),
            None => true,
        };
        if full {
            let size = self
                .sizing
                .next_size(self.blocks.last().map(Vec::capacity));
            self.blocks.push(Vec::with_capacity(size));
        }
        let last = self.blocks.len() - 1;
        &mut self.blocks[last]
    }
}

impl Default for BlockBuffer {
    fn default() -> Self {
        Self::new(BlockSizing::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> BlockSizing {
        BlockSizing {
            first_block: 2,
            max_block: 8,
        }
    }

    #[test]
    fn test_empty_buffer() {
        let buf = BlockBuffer::new(small());
        assert!(buf.is_empty());
        assert_eq!(buf.block_count(), 0);
        assert_eq!(buf.bytes().count(), 0);
    }

    #[test]
    fn test_push_spans_blocks_in_order() {
        let mut buf = BlockBuffer::new(small());
        for b in 0..30u8 {
            buf.push(b);
        }
        assert_eq!(buf.len(), 30);
        assert_eq!(buf.bytes().collect::<Vec<_>>(), (0..30u8).collect::<Vec<_>>());
        // 2 + 4 + 8 + 8 + 8 = 30
        assert_eq!(buf.block_count(), 5);
    }

    #[test]
    fn test_block_growth_is_capped() {
        let mut buf = BlockBuffer::new(small());
        buf.extend_from_slice(&[7u8; 100]);
        assert!(buf.blocks.iter().all(|b| b.capacity() <= 8));
        assert!(buf.allocated() >= 100);
    }

    #[test]
    fn test_extend_matches_push() {
        let data: Vec<u8> = (0..=255u8).collect();
        let mut a = BlockBuffer::new(small());
        let mut b = BlockBuffer::new(small());
        a.extend_from_slice(&data);
        for &byte in &data {
            b.push(byte);
        }
        assert_eq!(a.bytes().collect::<Vec<_>>(), b.bytes().collect::<Vec<_>>());
    }
}
