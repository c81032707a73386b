//! Single-writer session over the current index.
//!
//! Holds at most one in-flight build and one in-flight search. Starting
//! either cancels the previous one of the same kind, so callers never
//! observe a superseded result.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

use super::build::{build, LogIndex};
use crate::config::IndexConfig;
use crate::error::{IndexError, Outcome, Result};

#[derive(Debug, Default)]
struct SlotState {
    next_generation: u64,
    active: Option<(u64, CancellationToken)>,
}

/// One kind of in-flight work: at most one live token at a time.
#[derive(Debug, Default)]
struct Slot(Mutex<SlotState>);

impl Slot {
    /// Cancel the current holder and claim the slot with a fresh token.
    ///
    /// The slot is released when the returned guard drops.
    fn supersede(&self) -> SlotGuard<'_> {
        let token = CancellationToken::new();
        let mut state = self.0.lock();
        let generation = state.next_generation;
        state.next_generation += 1;
        if let Some((_, previous)) = state.active.replace((generation, token.clone())) {
            previous.cancel();
        }
        SlotGuard {
            slot: self,
            generation,
            token,
        }
    }

    fn cancel(&self) {
        if let Some((_, token)) = self.0.lock().active.take() {
            token.cancel();
        }
    }

    fn is_busy(&self) -> bool {
        self.0.lock().active.is_some()
    }
}

struct SlotGuard<'a> {
    slot: &'a Slot,
    generation: u64,
    token: CancellationToken,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.slot.0.lock();
        if matches!(state.active, Some((generation, _)) if generation == self.generation) {
            state.active = None;
        }
    }
}

#[derive(Debug, Default)]
pub struct IndexSession {
    config: IndexConfig,
    current: Mutex<Option<Arc<LogIndex>>>,
    build: Slot,
    search: Slot,
}

impl IndexSession {
    pub fn new(config: IndexConfig) -> Self {
        IndexSession {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// The most recently completed index, if any.
    pub fn index(&self) -> Option<Arc<LogIndex>> {
        self.current.lock().clone()
    }

    /// Build a new index from `source` and make it current.
    ///
    /// The previous index stays current until this build completes. A build
    /// that is superseded returns `Cancelled` and installs nothing.
    pub async fn load<R>(
        &self,
        source: R,
        source_len: Option<u64>,
        on_progress: &mut dyn FnMut(f64),
    ) -> Result<Outcome<Arc<LogIndex>>>
    where
        R: AsyncRead + Unpin,
    {
        let guard = self.build.supersede();
        let outcome = build(
            source,
            source_len,
            &self.config,
            on_progress,
            Some(&guard.token),
        )
        .await?;
        Ok(self.install(outcome, &guard.token))
    }

    /// [`load`](Self::load) from a file, using its length for progress.
    pub async fn load_path(
        &self,
        path: impl AsRef<Path>,
        on_progress: &mut dyn FnMut(f64),
    ) -> Result<Outcome<Arc<LogIndex>>> {
        let guard = self.build.supersede();
        let file = tokio::fs::File::open(path.as_ref()).await?;
        let len = file.metadata().await?.len();
        let outcome = build(file, Some(len), &self.config, on_progress, Some(&guard.token))
            .await?;
        Ok(self.install(outcome, &guard.token))
    }

    fn install(
        &self,
        outcome: Outcome<LogIndex>,
        token: &CancellationToken,
    ) -> Outcome<Arc<LogIndex>> {
        match outcome {
            Outcome::Complete(index) if !token.is_cancelled() => {
                let index = Arc::new(index);
                *self.current.lock() = Some(Arc::clone(&index));
                Outcome::Complete(index)
            }
            _ => Outcome::Cancelled,
        }
    }

    /// Search the current index, cancelling any search still in flight.
    pub async fn search(
        &self,
        query: &str,
        on_progress: Option<&mut dyn FnMut(f64)>,
    ) -> Result<Outcome<Vec<u32>>> {
        let index = self.index().ok_or(IndexError::NotLoaded)?;
        let guard = self.search.supersede();
        let outcome = index.search(query, on_progress, Some(&guard.token)).await?;
        if guard.token.is_cancelled() {
            return Ok(Outcome::Cancelled);
        }
        Ok(outcome)
    }

    /// Whether no build or search is in flight.
    pub fn is_idle(&self) -> bool {
        !self.build.is_busy() && !self.search.is_busy()
    }

    /// Cancel the in-flight build and search, if any.
    pub fn cancel_all(&self) {
        self.build.cancel();
        self.search.cancel();
    }
}
