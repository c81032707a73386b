//! In-memory trigram inverted index.
//!
//! Maps each trigram to a compressed [`PostingList`] of entry ordinals.
//! Populated once, in ordinal order, then only read.

use ahash::AHashMap;
use tokio_util::sync::CancellationToken;

use super::blocks::BlockSizing;
use super::error::CodecError;
use super::extract::{extract_trigrams, Trigram, TrigramScratch};
use super::posting::{intersect, PostingList};
use crate::error::Outcome;

/// Result of a trigram lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidates {
    /// Query is shorter than one trigram; every document is a candidate.
    All,
    /// Documents containing every query trigram, ascending.
    Matching(Vec<u32>),
}

impl Candidates {
    pub fn is_all(&self) -> bool {
        matches!(self, Candidates::All)
    }
}

/// Trigram → posting list index over normalized document text.
#[derive(Debug)]
pub struct TrigramIndex {
    postings: AHashMap<Trigram, PostingList>,
    sizing: BlockSizing,
    last_document: Option<u32>,
    document_count: u32,
    scratch: TrigramScratch,
}

impl TrigramIndex {
    pub fn new(sizing: BlockSizing) -> Self {
        TrigramIndex {
            postings: AHashMap::new(),
            sizing,
            last_document: None,
            document_count: 0,
            scratch: TrigramScratch::default(),
        }
    }

    /// Index `normalized_text` under `ordinal`.
    ///
    /// Ordinals must be strictly increasing across calls. Documents shorter
    /// than three characters are counted but contribute no trigrams.
    pub fn add_document(&mut self, ordinal: u32, normalized_text: &str) -> Result<(), CodecError> {
        if let Some(last) = self.last_document {
            if ordinal <= last {
                return Err(CodecError::NotIncreasing {
                    last,
                    next: ordinal,
                });
            }
        }

        let sizing = self.sizing;
        for trigram in self.scratch.extract(normalized_text) {
            self.postings
                .entry(*trigram)
                .or_insert_with(|| PostingList::new(sizing))
                .append(ordinal)?;
        }

        self.last_document = Some(ordinal);
        self.document_count += 1;
        Ok(())
    }

    /// Candidate documents for `normalized_query`.
    ///
    /// Candidates are a superset of the true matches: trigram membership does
    /// not preserve adjacency, so callers must verify each one.
    pub fn search(&self, normalized_query: &str) -> Candidates {
        match self.search_with_cancel(normalized_query, None) {
            Outcome::Complete(candidates) => candidates,
            Outcome::Cancelled => unreachable!("no cancellation token was supplied"),
        }
    }

    /// Like [`search`](Self::search), checking `cancel` between intersection steps.
    pub fn search_with_cancel(
        &self,
        normalized_query: &str,
        cancel: Option<&CancellationToken>,
    ) -> Outcome<Candidates> {
        let trigrams = extract_trigrams(normalized_query);
        if trigrams.is_empty() {
            return Outcome::Complete(Candidates::All);
        }

        let mut lists = Vec::with_capacity(trigrams.len());
        for trigram in &trigrams {
            match self.postings.get(trigram) {
                Some(list) => lists.push(list),
                // Trigram absent from every document → no matches.
                None => return Outcome::Complete(Candidates::Matching(Vec::new())),
            }
        }

        intersect(&lists, cancel).map(Candidates::Matching)
    }

    /// Posting list for one trigram.
    pub fn posting_list(&self, trigram: &Trigram) -> Option<&PostingList> {
        self.postings.get(trigram)
    }

    /// Number of documents added.
    pub fn document_count(&self) -> u32 {
        self.document_count
    }

    /// Number of distinct trigrams.
    pub fn trigram_count(&self) -> usize {
        self.postings.len()
    }

    /// Total encoded posting bytes.
    pub fn compressed_bytes(&self) -> usize {
        self.postings.values().map(PostingList::compressed_len).sum()
    }

    /// Total bytes reserved by posting-list blocks.
    pub fn allocated_bytes(&self) -> usize {
        self.postings.values().map(PostingList::allocated).sum()
    }
}

impl Default for TrigramIndex {
    fn default() -> Self {
        Self::new(BlockSizing::default())
    }
}
