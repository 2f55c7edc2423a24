use std::collections::BTreeMap;

use alloy_primitives::{I256, U256};
use chainequity_store::Store;
use chainequity_types::{EventType, BASIS_POINTS};

use crate::{
    error::CapTableError,
    multiplier::multiplier_at_block,
    snapshot::{format_with_decimals, percentage_of},
    types::{CapTableEntry, CapTableSnapshot},
};

/// Replays every `Transfer` up to and including `block_number` to
/// reconstruct the cap table as it stood at that height. `Transfer.amount`
/// is already the raw, pre-multiplier unit the decoder emits, so it is
/// summed as-is — no split multiplier is applied during replay, only to the
/// snapshot's reported `splitMultiplier` field. Running balances are kept
/// signed because a transfer can be indexed before its counterpart in the
/// same block, transiently driving a balance negative until the pair
/// settles.
pub async fn historical_snapshot_at_block(
    store: &Store,
    block_number: u64,
) -> Result<CapTableSnapshot, CapTableError> {
    let highest = store.highest_indexed_block().await?.unwrap_or(0);
    if block_number > highest {
        return Err(CapTableError::BlockNotYetIndexed(block_number, highest));
    }

    let splits = ascending_splits(store).await?;
    let multiplier_bps = multiplier_at_block(&splits, block_number);

    let events = store.get_events_by_block_range(0, block_number).await?;
    let mut running: BTreeMap<String, I256> = BTreeMap::new();
    let mut last_timestamp = 0u64;

    for event in events.into_iter().filter(|e| e.event_type == EventType::Transfer) {
        let Some(amount) = event.amount else { continue };
        let raw_delta = I256::try_from(amount.as_u256()).unwrap_or(I256::MAX);
        last_timestamp = last_timestamp.max(event.timestamp);

        if let Some(from) = &event.from_address {
            if !from.is_zero() {
                *running.entry(from.as_str().to_string()).or_default() -= raw_delta;
            }
        }
        if let Some(to) = &event.to_address {
            if !to.is_zero() {
                *running.entry(to.as_str().to_string()).or_default() += raw_delta;
            }
        }
    }

    let mut total_raw_supply = U256::ZERO;
    let mut entries: Vec<(String, U256)> = Vec::with_capacity(running.len());

    for (address, raw_balance) in running {
        let raw_nonneg = if raw_balance.is_negative() { U256::ZERO } else { raw_balance.unsigned_abs() };

        if raw_nonneg.is_zero() {
            continue;
        }

        total_raw_supply = total_raw_supply.saturating_add(raw_nonneg);
        entries.push((address, raw_nonneg));
    }

    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let holders: Vec<CapTableEntry> = entries
        .into_iter()
        .map(|(address, raw)| CapTableEntry {
            percentage: percentage_of(raw, total_raw_supply),
            balance: format_with_decimals(raw),
            raw_balance: raw.to_string(),
            last_updated: None,
            address,
        })
        .collect();

    Ok(CapTableSnapshot {
        block_number,
        timestamp: last_timestamp,
        total_supply: total_raw_supply.to_string(),
        total_supply_formatted: format_with_decimals(total_raw_supply),
        split_multiplier: multiplier_bps as f64 / BASIS_POINTS as f64,
        holder_count: holders.len(),
        holders,
    })
}

async fn ascending_splits(store: &Store) -> Result<Vec<(u64, u64)>, CapTableError> {
    let mut actions = store.get_corporate_actions_by_type("StockSplit", i64::MAX).await?;
    actions.sort_by_key(|a| a.block_number);

    Ok(actions
        .into_iter()
        .filter_map(|a| a.new_value.parse::<u64>().ok().map(|bps| (a.block_number, bps)))
        .collect())
}

#[cfg(test)]
mod tests {
    use chainequity_types::{Address, Event, RawAmount};
    use serde_json::json;

    use super::*;

    fn transfer(block: u64, log_index: u64, from: &str, to: &str, amount: u64) -> Event {
        Event {
            id: None,
            block_number: block,
            transaction_hash: format!("0x{block:x}{log_index:x}"),
            log_index,
            event_type: EventType::Transfer,
            from_address: Some(Address::parse(from).unwrap()),
            to_address: Some(Address::parse(to).unwrap()),
            amount: Some(RawAmount::parse(&amount.to_string()).unwrap()),
            data: json!({}),
            gas_used: None,
            gas_price: None,
            timestamp: 1_700_000_000 + block,
        }
    }

    /// A `Transfer` event carrying `whole_tokens · 10^18`.
    fn transfer_units(block: u64, log_index: u64, from: &str, to: &str, whole_tokens: u64) -> Event {
        let mut event = transfer(block, log_index, from, to, whole_tokens);
        event.amount = Some(RawAmount::parse(&format!("{whole_tokens}000000000000000000")).unwrap());
        event
    }

    #[tokio::test]
    async fn replays_mint_then_transfer() {
        let store = Store::connect("sqlite::memory:").await.unwrap();
        let alice = "0x1111111111111111111111111111111111111111";
        let bob = "0x2222222222222222222222222222222222222222";

        store.insert_event(&transfer_units(1, 0, Address::ZERO, alice, 1_000)).await.unwrap();
        store.insert_event(&transfer_units(2, 0, alice, bob, 400)).await.unwrap();

        let snapshot = historical_snapshot_at_block(&store, 2).await.unwrap();
        assert_eq!(snapshot.total_supply, "1000000000000000000000");
        assert_eq!(snapshot.total_supply_formatted, "1000");
        assert_eq!(snapshot.holder_count, 2);
        assert_eq!(snapshot.holders[0].address, alice);
        assert_eq!(snapshot.holders[0].balance, "600");
        assert_eq!(snapshot.holders[0].percentage, 60.0);
        assert_eq!(snapshot.holders[1].address, bob);
        assert_eq!(snapshot.holders[1].balance, "400");
        assert_eq!(snapshot.holders[1].percentage, 40.0);
    }

    #[tokio::test]
    async fn snapshot_at_earlier_block_excludes_later_transfers() {
        let store = Store::connect("sqlite::memory:").await.unwrap();
        let alice = "0x1111111111111111111111111111111111111111";
        let bob = "0x2222222222222222222222222222222222222222";

        store.insert_event(&transfer_units(1, 0, Address::ZERO, alice, 1_000)).await.unwrap();
        store.insert_event(&transfer_units(5, 0, alice, bob, 400)).await.unwrap();

        let snapshot = historical_snapshot_at_block(&store, 1).await.unwrap();
        assert_eq!(snapshot.holder_count, 1);
        assert_eq!(snapshot.holders[0].address, alice);
        assert_eq!(snapshot.holders[0].balance, "1000");
    }

    #[tokio::test]
    async fn rejects_block_beyond_indexed_tip() {
        let store = Store::connect("sqlite::memory:").await.unwrap();
        store.insert_event(&transfer(1, 0, Address::ZERO, "0x1111111111111111111111111111111111111111", 1)).await.unwrap();

        let result = historical_snapshot_at_block(&store, 99).await;
        assert!(matches!(result, Err(CapTableError::BlockNotYetIndexed(99, 1))));
    }

    #[tokio::test]
    async fn stock_split_changes_multiplier_not_stored_balances() {
        let store = Store::connect("sqlite::memory:").await.unwrap();
        let alice = "0x1111111111111111111111111111111111111111";

        store.insert_event(&transfer_units(10, 0, Address::ZERO, alice, 1_000)).await.unwrap();
        store
            .insert_corporate_action(&chainequity_types::CorporateAction {
                id: None,
                action_type: chainequity_types::ActionType::StockSplit,
                block_number: 20,
                transaction_hash: "0xsplit".into(),
                old_value: "10000".into(),
                new_value: "20000".into(),
                timestamp: 1_700_000_020,
            })
            .await
            .unwrap();

        let before = historical_snapshot_at_block(&store, 19).await.unwrap();
        assert_eq!(before.split_multiplier, 1.0);
        assert_eq!(before.total_supply, "1000000000000000000000");

        let after = historical_snapshot_at_block(&store, 20).await.unwrap();
        assert_eq!(after.split_multiplier, 2.0);
        assert_eq!(after.total_supply, "1000000000000000000000");
        assert_eq!(after.total_supply_formatted, "1000");
    }

    /// A `Transfer` whose block falls *after* a `StockSplit` must still be
    /// summed as a raw, unconverted amount — dividing it by the 2x
    /// multiplier in force at its block would silently halve the moved
    /// balance and desync the historical snapshot from the live `Balance`
    /// cache (spec §4.5.1 step 3, §9).
    #[tokio::test]
    async fn transfer_after_split_is_not_rescaled_by_the_multiplier() {
        let store = Store::connect("sqlite::memory:").await.unwrap();
        let alice = "0x1111111111111111111111111111111111111111";
        let bob = "0x2222222222222222222222222222222222222222";

        store.insert_event(&transfer_units(10, 0, Address::ZERO, alice, 1_000)).await.unwrap();
        store
            .insert_corporate_action(&chainequity_types::CorporateAction {
                id: None,
                action_type: chainequity_types::ActionType::StockSplit,
                block_number: 20,
                transaction_hash: "0xsplit".into(),
                old_value: "10000".into(),
                new_value: "20000".into(),
                timestamp: 1_700_000_020,
            })
            .await
            .unwrap();
        store.insert_event(&transfer_units(30, 0, alice, bob, 400)).await.unwrap();

        let snapshot = historical_snapshot_at_block(&store, 30).await.unwrap();
        assert_eq!(snapshot.split_multiplier, 2.0);
        assert_eq!(snapshot.total_supply, "1000000000000000000000");
        assert_eq!(snapshot.total_supply_formatted, "1000");

        let alice_entry = snapshot.holders.iter().find(|h| h.address == alice).unwrap();
        assert_eq!(alice_entry.raw_balance, "600000000000000000000");
        let bob_entry = snapshot.holders.iter().find(|h| h.address == bob).unwrap();
        assert_eq!(bob_entry.raw_balance, "400000000000000000000");
    }
}
