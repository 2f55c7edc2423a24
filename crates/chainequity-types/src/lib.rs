//! Domain types shared by every layer of the indexer: the canonical
//! event/balance/corporate-action shapes, plus the small value types
//! (`Address`, `RawAmount`) they're built from.
//!
//! This crate performs no I/O; it only defines data and the invariants that
//! belong to the data itself (e.g. address normalization).

mod address;
mod amount;
mod error;
mod event;

pub use address::Address;
pub use amount::RawAmount;
pub use error::TypesError;
pub use event::{ActionType, Balance, CorporateAction, Event, EventType};

/// Denominator for split-multiplier basis points: `20000 basis points = 2.0x`.
pub const BASIS_POINTS: u64 = 10_000;

/// The token's fixed smallest-unit count. Not part of the on-disk schema;
/// fetched once from the contract at startup (`decimals()`) and otherwise
/// assumed to be the common ERC-20 default everywhere a fixed constant is
/// needed offline (e.g. in the cap-table engine, which never calls the
/// chain directly).
pub const TOKEN_DECIMALS: u32 = 18;
