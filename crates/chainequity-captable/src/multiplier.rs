use chainequity_store::{Store, StoreError};
use chainequity_types::BASIS_POINTS;

/// Same metadata key the indexer writes on every `StockSplit` — kept here
/// too since cap-table reads have no dependency on the indexer crate.
const SPLIT_MULTIPLIER_KEY: &str = "split_multiplier";

pub async fn current_split_multiplier_bps(store: &Store) -> Result<u64, StoreError> {
    match store.get_metadata(SPLIT_MULTIPLIER_KEY).await? {
        Some(raw) => raw
            .parse()
            .map_err(|_| StoreError::Corrupt(format!("non-numeric {SPLIT_MULTIPLIER_KEY}: {raw}"))),
        None => Ok(BASIS_POINTS),
    }
}

/// Multiplier in effect at `block_number`, derived from the corporate
/// action history rather than the live metadata cell, so historical
/// snapshots reflect the multiplier as of the requested block rather than
/// the current one.
pub fn multiplier_at_block(splits_ascending: &[(u64, u64)], block_number: u64) -> u64 {
    splits_ascending
        .iter()
        .rev()
        .find(|(split_block, _)| *split_block <= block_number)
        .map(|(_, bps)| *bps)
        .unwrap_or(BASIS_POINTS)
}
