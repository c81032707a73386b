//! Streaming index build.
//!
//! Pulls records from a [`RecordReader`], assigns ordinals in source order,
//! stores each entry with its metadata and feeds the normalized message to
//! the trigram index. Yields to the runtime every `yield_every` records.

use std::path::Path;
use std::time::Instant;

use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

use crate::config::{IndexConfig, MalformedEntryPolicy};
use crate::error::{IndexError, Outcome, Result};
use crate::journal::{line_count, EntryMetadata, LogEntry, RawRecord, RecordReader};
use crate::progress::{fraction, ProgressThrottle};
use crate::search::normalize_into;
use crate::trigram::varint::MAX_VALUE;
use crate::trigram::TrigramIndex;

/// Immutable, queryable index over one journal source.
///
/// Read API lives in [`query`](super::query).
#[derive(Debug)]
pub struct LogIndex {
    pub(super) entries: Vec<LogEntry>,
    pub(super) metadata: Vec<EntryMetadata>,
    pub(super) trigrams: TrigramIndex,
    pub(super) source_len: u64,
    pub(super) skipped: u64,
    pub(super) verify_yield_every: usize,
}

/// Accumulates entries in ordinal order.
#[derive(Debug)]
pub struct LogIndexBuilder {
    entries: Vec<LogEntry>,
    metadata: Vec<EntryMetadata>,
    trigrams: TrigramIndex,
    policy: MalformedEntryPolicy,
    skipped: u64,
    verify_yield_every: usize,
    folded: String,
}

impl LogIndexBuilder {
    pub fn new(config: &IndexConfig) -> Self {
        LogIndexBuilder {
            entries: Vec::new(),
            metadata: Vec::new(),
            trigrams: TrigramIndex::new(config.block_sizing()),
            policy: config.malformed_entry_policy,
            skipped: 0,
            verify_yield_every: config.verify_yield_every,
            folded: String::new(),
        }
    }

    /// Entries accepted so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records dropped under [`MalformedEntryPolicy::Skip`].
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Materialize `record` and append it.
    ///
    /// Returns the assigned ordinal, or `None` if the record was skipped.
    pub fn push_record(&mut self, record: &RawRecord) -> Result<Option<u32>> {
        match record.to_entry() {
            Ok(entry) => self.push_entry(entry, record.begin, record.end).map(Some),
            Err(source) => {
                let err = IndexError::Entry {
                    begin: record.begin,
                    end: record.end,
                    source,
                };
                self.reject(err)?;
                Ok(None)
            }
        }
    }

    /// Append an already materialized entry spanning `begin..end`.
    pub fn push_entry(&mut self, entry: LogEntry, begin: u64, end: u64) -> Result<u32> {
        let ordinal = u32::try_from(self.entries.len())
            .ok()
            .filter(|ordinal| *ordinal <= MAX_VALUE)
            .ok_or(IndexError::TooManyEntries(MAX_VALUE))?;

        normalize_into(&entry.message, &mut self.folded);
        self.trigrams.add_document(ordinal, &self.folded)?;
        self.metadata.push(EntryMetadata {
            line_count: line_count(&entry.message),
            start_byte: begin,
            end_byte: end,
        });
        self.entries.push(entry);
        Ok(ordinal)
    }

    /// Apply the malformed-entry policy to `err`.
    fn reject(&mut self, err: IndexError) -> Result<()> {
        match self.policy {
            MalformedEntryPolicy::Abort => Err(err),
            MalformedEntryPolicy::Skip => {
                tracing::warn!(error = %err, "skipping malformed journal record");
                self.skipped += 1;
                Ok(())
            }
        }
    }

    pub fn finish(self, source_len: u64) -> LogIndex {
        LogIndex {
            entries: self.entries,
            metadata: self.metadata,
            trigrams: self.trigrams,
            source_len,
            skipped: self.skipped,
            verify_yield_every: self.verify_yield_every,
        }
    }
}

/// Build an index by streaming `source` to the end.
///
/// `source_len` is only the progress denominator; when unknown, progress
/// stays at 0 until the final 1.0. Returns `Cancelled` if `cancel` fires
/// at a batch boundary, discarding everything built so far.
pub async fn build<R>(
    source: R,
    source_len: Option<u64>,
    config: &IndexConfig,
    on_progress: &mut dyn FnMut(f64),
    cancel: Option<&CancellationToken>,
) -> Result<Outcome<LogIndex>>
where
    R: AsyncRead + Unpin,
{
    config.validate()?;
    let started = Instant::now();
    let is_cancelled = || cancel.is_some_and(CancellationToken::is_cancelled);

    let mut reader = RecordReader::open(source, config.read_chunk_size).await?;
    tracing::info!(format = %reader.format(), source_len, "index build started");

    let mut builder = LogIndexBuilder::new(config);
    let mut progress = ProgressThrottle::new(on_progress);
    let mut batch = 0usize;
    loop {
        match reader.next_record().await {
            Ok(Some(record)) => {
                builder.push_record(&record)?;
            }
            Ok(None) => break,
            Err(err) if err.is_recoverable() => builder.reject(err.into())?,
            Err(err) => return Err(err.into()),
        }

        batch += 1;
        if batch == config.yield_every {
            batch = 0;
            progress.report(fraction(reader.bytes_read(), source_len));
            tracing::trace!(
                entries = builder.len(),
                bytes = reader.bytes_read(),
                "build batch done"
            );
            tokio::task::yield_now().await;
            if is_cancelled() {
                tracing::info!(entries = builder.len(), "index build cancelled");
                return Ok(Outcome::Cancelled);
            }
        }
    }
    if is_cancelled() {
        return Ok(Outcome::Cancelled);
    }
    progress.report(1.0);

    let index = builder.finish(reader.bytes_read());
    tracing::info!(
        entries = index.entries.len(),
        skipped = index.skipped,
        trigrams = index.trigrams.trigram_count(),
        posting_bytes = index.trigrams.compressed_bytes(),
        bytes = index.source_len,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "index build finished"
    );
    Ok(Outcome::Complete(index))
}

/// Open `path` and [`build`] over it, using the file length for progress.
pub async fn build_from_path(
    path: impl AsRef<Path>,
    config: &IndexConfig,
    on_progress: &mut dyn FnMut(f64),
    cancel: Option<&CancellationToken>,
) -> Result<Outcome<LogIndex>> {
    let file = tokio::fs::File::open(path.as_ref()).await?;
    let len = file.metadata().await?.len();
    build(file, Some(len), config, on_progress, cancel).await
}
