//! Read API and substring search over a built [`LogIndex`].

use std::ops::Range;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::build::LogIndex;
use crate::error::{IndexError, Outcome, Result};
use crate::journal::{EntryMetadata, LogEntry};
use crate::progress::{fraction, ProgressThrottle};
use crate::search::{normalize, normalize_into, LiteralMatcher};
use crate::trigram::Candidates;

/// Size summary of a built index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub entry_count: u32,
    pub skipped_records: u64,
    pub trigram_count: usize,
    pub posting_bytes: usize,
    pub posting_allocated_bytes: usize,
    pub source_bytes: u64,
}

impl LogIndex {
    pub fn entry_count(&self) -> u32 {
        // Bounded by the ordinal ceiling at build time.
        self.entries.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn check(&self, ordinal: u32) -> Result<usize> {
        let count = self.entry_count();
        if ordinal < count {
            Ok(ordinal as usize)
        } else {
            Err(IndexError::OutOfRange { ordinal, count })
        }
    }

    pub fn get_entry(&self, ordinal: u32) -> Result<&LogEntry> {
        self.check(ordinal).map(|i| &self.entries[i])
    }

    pub fn metadata(&self, ordinal: u32) -> Result<&EntryMetadata> {
        self.check(ordinal).map(|i| &self.metadata[i])
    }

    /// Visual lines in the entry's message.
    pub fn line_count(&self, ordinal: u32) -> Result<u32> {
        self.metadata(ordinal).map(|m| m.line_count)
    }

    /// Half-open byte range of the entry's raw record in the source.
    pub fn byte_range(&self, ordinal: u32) -> Result<Range<u64>> {
        self.metadata(ordinal).map(|m| m.start_byte..m.end_byte)
    }

    /// Bytes read from the source during the build.
    pub fn source_len(&self) -> u64 {
        self.source_len
    }

    /// Entries in ordinal order.
    pub fn entries(&self) -> impl ExactSizeIterator<Item = &LogEntry> + '_ {
        self.entries.iter()
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            entry_count: self.entry_count(),
            skipped_records: self.skipped,
            trigram_count: self.trigrams.trigram_count(),
            posting_bytes: self.trigrams.compressed_bytes(),
            posting_allocated_bytes: self.trigrams.allocated_bytes(),
            source_bytes: self.source_len,
        }
    }

    /// Ordinals of entries whose message contains `query`, ignoring case,
    /// in ascending order.
    ///
    /// An empty query matches nothing. A query shorter than one trigram
    /// verifies every entry. `on_progress` receives the fraction of
    /// candidates verified. Returns `Cancelled`, with no partial result,
    /// once `cancel` fires.
    pub async fn search(
        &self,
        query: &str,
        on_progress: Option<&mut dyn FnMut(f64)>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Outcome<Vec<u32>>> {
        let needle = normalize(query);
        if needle.is_empty() {
            return Ok(Outcome::Complete(Vec::new()));
        }
        let is_cancelled = || cancel.is_some_and(CancellationToken::is_cancelled);
        if is_cancelled() {
            return Ok(Outcome::Cancelled);
        }

        let candidates = match self.trigrams.search_with_cancel(&needle, cancel) {
            Outcome::Cancelled => return Ok(Outcome::Cancelled),
            Outcome::Complete(Candidates::All) => (0..self.entry_count()).collect(),
            Outcome::Complete(Candidates::Matching(ordinals)) => ordinals,
        };

        let matcher = LiteralMatcher::new(&needle);
        let total = candidates.len() as u64;
        let mut progress = on_progress.map(ProgressThrottle::new);
        let mut matches = Vec::new();
        let mut folded = String::new();
        for (done, &ordinal) in candidates.iter().enumerate() {
            if is_cancelled() {
                tracing::debug!(query, verified = done, "search cancelled");
                return Ok(Outcome::Cancelled);
            }
            let entry = self
                .entries
                .get(ordinal as usize)
                .ok_or(IndexError::MissingCandidate(ordinal))?;
            normalize_into(&entry.message, &mut folded);
            if matcher.is_match(&folded) {
                matches.push(ordinal);
            }

            if (done + 1) % self.verify_yield_every == 0 {
                if let Some(progress) = progress.as_mut() {
                    progress.report(fraction(done as u64 + 1, Some(total)));
                }
                tokio::task::yield_now().await;
            }
        }
        // The last batch may have ended in a yield.
        if is_cancelled() {
            tracing::debug!(query, verified = total, "search cancelled");
            return Ok(Outcome::Cancelled);
        }
        if let Some(progress) = progress.as_mut() {
            progress.report(1.0);
        }

        tracing::debug!(
            query,
            candidates = total,
            matches = matches.len(),
            "search finished"
        );
        Ok(Outcome::Complete(matches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexConfig;
    use crate::index::build::LogIndexBuilder;
    use chrono::DateTime;

    fn entry(message: &str) -> LogEntry {
        LogEntry {
            timestamp: DateTime::from_timestamp_micros(0).unwrap(),
            priority: None,
            unit: None,
            syslog_identifier: None,
            message: message.to_string(),
        }
    }

    fn index_of(messages: &[&str], config: &IndexConfig) -> LogIndex {
        let mut builder = LogIndexBuilder::new(config);
        let mut offset = 0;
        for message in messages {
            let len = message.len() as u64;
            builder.push_entry(entry(message), offset, offset + len).unwrap();
            offset += len + 1;
        }
        builder.finish(offset)
    }

    async fn search(index: &LogIndex, query: &str) -> Vec<u32> {
        index
            .search(query, None, None)
            .await
            .unwrap()
            .complete()
            .unwrap()
    }

    #[tokio::test]
    async fn test_search_verifies_candidates() {
        let index = index_of(&["abcxbcd", "ABCD", "nothing"], &IndexConfig::default());
        assert_eq!(search(&index, "abcd").await, vec![1]);
        assert_eq!(search(&index, "BCD").await, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_short_and_empty_queries() {
        let index = index_of(&["ab", "xaby", "zz"], &IndexConfig::default());
        assert_eq!(search(&index, "AB").await, vec![0, 1]);
        assert_eq!(search(&index, "z").await, vec![2]);
        assert_eq!(search(&index, "").await, Vec::<u32>::new());
    }

    #[tokio::test]
    async fn test_search_progress() {
        let config = IndexConfig::builder().verify_yield_every(2).build().unwrap();
        let messages: Vec<String> = (0..20).map(|i| format!("line {i}")).collect();
        let refs: Vec<&str> = messages.iter().map(String::as_str).collect();
        let index = index_of(&refs, &config);

        let mut seen = Vec::new();
        let mut on_progress = |p: f64| seen.push(p);
        let matches = index
            .search("line", Some(&mut on_progress), None)
            .await
            .unwrap()
            .complete()
            .unwrap();
        assert_eq!(matches.len(), 20);
        assert!(seen.len() > 2);
        assert_eq!(seen.last(), Some(&1.0));
    }

    #[tokio::test]
    async fn test_cancelled_search_is_not_empty_result() {
        let index = index_of(&["apple pie"], &IndexConfig::default());
        let token = CancellationToken::new();
        token.cancel();
        let outcome = index.search("apple", None, Some(&token)).await.unwrap();
        assert_eq!(outcome, Outcome::Cancelled);
        let outcome = index.search("xyz", None, None).await.unwrap();
        assert_eq!(outcome, Outcome::Complete(vec![]));
    }

    #[tokio::test]
    async fn test_cancel_while_verifying() {
        let config = IndexConfig::builder().verify_yield_every(2).build().unwrap();
        let messages: Vec<String> = (0..10).map(|i| format!("line {i}")).collect();
        let refs: Vec<&str> = messages.iter().map(String::as_str).collect();
        let index = index_of(&refs, &config);

        let token = CancellationToken::new();
        let mut seen = Vec::new();
        let mut on_progress = |p: f64| seen.push(p);
        // The search verifies one batch and yields; the token fires before
        // it resumes.
        let (outcome, ()) = tokio::join!(
            index.search("line", Some(&mut on_progress), Some(&token)),
            async { token.cancel() }
        );
        assert_eq!(outcome.unwrap(), Outcome::Cancelled);
        assert!(!seen.is_empty());
        assert!(!seen.contains(&1.0));
    }

    #[tokio::test]
    async fn test_cancel_during_last_yield() {
        let config = IndexConfig::builder().verify_yield_every(1).build().unwrap();
        let index = index_of(&["apple pie"], &config);
        let token = CancellationToken::new();
        let (outcome, ()) = tokio::join!(
            index.search("apple", None, Some(&token)),
            async { token.cancel() }
        );
        assert_eq!(outcome.unwrap(), Outcome::Cancelled);
    }

    #[test]
    fn test_read_api() {
        let index = index_of(&["one", "two\nlines"], &IndexConfig::default());
        assert_eq!(index.entry_count(), 2);
        assert_eq!(index.get_entry(1).unwrap().message, "two\nlines");
        assert_eq!(index.line_count(1).unwrap(), 2);
        assert_eq!(index.byte_range(1).unwrap(), 4..13);
        assert!(matches!(
            index.get_entry(2),
            Err(IndexError::OutOfRange { ordinal: 2, count: 2 })
        ));
        assert!(index.line_count(u32::MAX).is_err());

        let stats = index.stats();
        assert_eq!(stats.entry_count, 2);
        assert!(stats.trigram_count > 0);
        assert!(stats.posting_bytes > 0);
        assert_eq!(stats.source_bytes, 14);
    }
}
