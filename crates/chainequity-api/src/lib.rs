//! A REST surface over the cap table, analytics, corporate action history,
//! and the raw event log.

mod csv;
mod error;
mod router;
mod routes;
mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
