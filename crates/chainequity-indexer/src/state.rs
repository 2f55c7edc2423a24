use std::fmt;

/// Indexer lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexerState {
    /// Backfilling from the last persisted block up to the chain head.
    Starting,
    /// Caught up; consuming new heads via subscription and/or poll.
    Running,
    /// Catching up a gap detected by the poll safety net or a resumed
    /// subscription (distinct from `Starting` only in that balances already
    /// exist and are being incrementally updated, not bootstrapped).
    Syncing,
    /// The push subscription dropped; retrying with backoff while the poll
    /// safety net keeps making progress.
    Reconnecting,
    Stopped,
}

impl fmt::Display for IndexerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            IndexerState::Starting => "starting",
            IndexerState::Running => "running",
            IndexerState::Syncing => "syncing",
            IndexerState::Reconnecting => "reconnecting",
            IndexerState::Stopped => "stopped",
        };
        f.write_str(label)
    }
}

/// A cheaply-cloneable read handle onto the indexer's current state, backed
/// by a `tokio::sync::watch` channel so the API layer can report health
/// without locking the indexer's own task.
#[derive(Clone)]
pub struct StateHandle {
    rx: tokio::sync::watch::Receiver<IndexerState>,
}

impl StateHandle {
    pub fn current(&self) -> IndexerState {
        *self.rx.borrow()
    }
}

pub(crate) struct StateCell {
    tx: tokio::sync::watch::Sender<IndexerState>,
}

impl StateCell {
    pub(crate) fn new(initial: IndexerState) -> (Self, StateHandle) {
        let (tx, rx) = tokio::sync::watch::channel(initial);
        (Self { tx }, StateHandle { rx })
    }

    pub(crate) fn set(&self, state: IndexerState) {
        tracing::info!(%state, "indexer state transition");
        let _ = self.tx.send(state);
    }
}
