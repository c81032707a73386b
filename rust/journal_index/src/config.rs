//! Index build and search configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::trigram::BlockSizing;

/// What to do with a record that cannot be turned into a log entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedEntryPolicy {
    /// Fail the whole build.
    #[default]
    Abort,
    /// Log a warning and drop the record. No ordinal is consumed.
    Skip,
}

impl MalformedEntryPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "abort" => Some(Self::Abort),
            "skip" => Some(Self::Skip),
            _ => None,
        }
    }
}

/// Tunables for [`build`](crate::build) and [`LogIndex::search`](crate::LogIndex::search).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Bytes requested from the source per read.
    pub read_chunk_size: usize,
    /// Entries indexed between cooperative yields and progress reports.
    pub yield_every: usize,
    /// Candidates verified between cooperative yields.
    pub verify_yield_every: usize,
    /// Size of the first block of every posting list.
    pub posting_first_block: usize,
    /// Cap on posting-list block size.
    pub posting_block_size: usize,
    pub malformed_entry_policy: MalformedEntryPolicy,
}

impl IndexConfig {
    pub const DEFAULT_READ_CHUNK_SIZE: usize = 64 * 1024;
    pub const DEFAULT_YIELD_EVERY: usize = 1000;
    pub const DEFAULT_VERIFY_YIELD_EVERY: usize = 4096;

    pub fn builder() -> IndexConfigBuilder {
        IndexConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("read_chunk_size", self.read_chunk_size),
            ("yield_every", self.yield_every),
            ("verify_yield_every", self.verify_yield_every),
            ("posting_first_block", self.posting_first_block),
            ("posting_block_size", self.posting_block_size),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero { field });
            }
        }
        if self.posting_first_block > self.posting_block_size {
            return Err(ConfigError::BlockSizes {
                first: self.posting_first_block,
                max: self.posting_block_size,
            });
        }
        Ok(())
    }

    pub fn block_sizing(&self) -> BlockSizing {
        BlockSizing {
            first_block: self.posting_first_block,
            max_block: self.posting_block_size,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            read_chunk_size: Self::DEFAULT_READ_CHUNK_SIZE,
            yield_every: Self::DEFAULT_YIELD_EVERY,
            verify_yield_every: Self::DEFAULT_VERIFY_YIELD_EVERY,
            posting_first_block: BlockSizing::DEFAULT_FIRST_BLOCK,
            posting_block_size: BlockSizing::DEFAULT_MAX_BLOCK,
            malformed_entry_policy: MalformedEntryPolicy::Abort,
        }
    }
}

/// Builder for [`IndexConfig`]; `build()` validates.
#[derive(Debug, Clone, Default)]
pub struct IndexConfigBuilder {
    config: IndexConfig,
}

impl IndexConfigBuilder {
    pub fn read_chunk_size(mut self, bytes: usize) -> Self {
        self.config.read_chunk_size = bytes;
        self
    }

    pub fn yield_every(mut self, entries: usize) -> Self {
        self.config.yield_every = entries;
        self
    }

    pub fn verify_yield_every(mut self, candidates: usize) -> Self {
        self.config.verify_yield_every = candidates;
        self
    }

    pub fn posting_blocks(mut self, first: usize, max: usize) -> Self {
        self.config.posting_first_block = first;
        self.config.posting_block_size = max;
        self
    }

    pub fn malformed_entry_policy(mut self, policy: MalformedEntryPolicy) -> Self {
        self.config.malformed_entry_policy = policy;
        self
    }

    pub fn build(self) -> Result<IndexConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
