//! A thin abstraction over an EVM JSON-RPC endpoint plus an optional push
//! subscription, scoped to exactly one `(url, contractAddress)` pair.

mod client;
mod contract;
mod error;

pub use client::{AlloyChainClient, BlockInfo, ChainClient, RawLog, ReceiptInfo};
pub use contract::IEquityToken;
pub use error::ChainClientError;
