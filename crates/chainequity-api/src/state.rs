use std::time::Instant;

use chainequity_indexer::StateHandle;
use chainequity_store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub indexer_state: StateHandle,
    /// Process start, used to compute `/health`'s `uptime` in seconds.
    pub started_at: Instant,
}

impl AppState {
    pub fn new(store: Store, indexer_state: StateHandle) -> Self {
        Self { store, indexer_state, started_at: Instant::now() }
    }
}
