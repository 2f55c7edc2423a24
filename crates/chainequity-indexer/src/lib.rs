//! Drives catch-up and live indexing by combining a (best-effort) push
//! subscription, a debounce window, and an always-on poll safety net,
//! applying decoded events to the store.

mod apply;
mod backoff;
mod error;
mod guard;
mod indexer;
mod state;

pub use apply::{apply_prepared_event, current_split_multiplier_bps, prepare_decoded_event, PreparedEvent};
pub use backoff::ReconnectPolicy;
pub use error::IndexerError;
pub use guard::AutoIndexGuard;
pub use indexer::{Indexer, IndexerConfig};
pub use state::{IndexerState, StateHandle};
