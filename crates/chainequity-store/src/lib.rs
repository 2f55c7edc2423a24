//! A single-file SQLite database (WAL mode) holding the event log, cached
//! current balances, corporate action history, and free-form metadata (e.g.
//! the cumulative split multiplier and the last-indexed block).

mod error;
mod rows;
mod schema;
mod store;

pub use error::StoreError;
pub use store::{Store, StoreTransaction};
