use alloy_primitives::I256;
use chainequity_store::Store;
use chainequity_types::{Address, EventType};

use crate::{
    error::CapTableError,
    types::{BalanceChangeEntry, BalanceChangeKind},
};

/// Classifies every `Transfer` touching `address` from that address's point
/// of view, ascending by block (spec §4.5: "Filter Transfer events... ascending.
/// For each, classify..."), with each entry's running cumulative balance
/// folded in alongside it. Mint is detected by a zero-address sender; a
/// self-transfer (`from == to == address`) is reported once, not twice.
///
/// `Store::get_events_by_address` returns its rows in descending order,
/// `LIMIT`ed at the SQL level (§4.1's own contract for that query) — so a
/// caller-supplied `limit` there would cut off the *oldest* end of the
/// address's history before cumulative balance could ever be folded over it,
/// leaving the running total wrong from the first returned row onward. To
/// keep the cumulative balance correct, the full (unbounded) history is
/// fetched and folded in ascending order first; `limit` is then applied only
/// to how many of the most recent, already-correct entries are returned.
pub async fn balance_change_history(
    store: &Store,
    address: &str,
    limit: i64,
) -> Result<Vec<BalanceChangeEntry>, CapTableError> {
    let target = Address::parse(address).map_err(|_| CapTableError::Store(
        chainequity_store::StoreError::Corrupt(address.to_string()),
    ))?;

    let mut events = store.get_events_by_address(target.as_str(), i64::MAX).await?;
    events.sort_by_key(|e| (e.block_number, e.log_index));

    let mut cumulative = I256::ZERO;

    let mut entries: Vec<BalanceChangeEntry> = events
        .into_iter()
        .filter(|e| e.event_type == EventType::Transfer)
        .filter_map(|e| {
            let from = e.from_address.clone()?;
            let to = e.to_address.clone()?;
            let amount = e.amount.clone()?;

            let kind = if from == to && from.as_str() == target.as_str() {
                BalanceChangeKind::SelfTransfer
            } else if from.is_zero() && to.as_str() == target.as_str() {
                BalanceChangeKind::Mint
            } else if from.as_str() == target.as_str() {
                BalanceChangeKind::TransferSent
            } else {
                BalanceChangeKind::TransferReceived
            };

            let counterparty = match kind {
                BalanceChangeKind::SelfTransfer => None,
                BalanceChangeKind::Mint => None,
                BalanceChangeKind::TransferSent => Some(to.as_str().to_string()),
                BalanceChangeKind::TransferReceived => Some(from.as_str().to_string()),
            };

            let signed_amount = I256::try_from(amount.as_u256()).unwrap_or(I256::MAX);
            let change = match kind {
                BalanceChangeKind::SelfTransfer => I256::ZERO,
                BalanceChangeKind::TransferSent => -signed_amount,
                BalanceChangeKind::Mint | BalanceChangeKind::TransferReceived => signed_amount,
            };
            cumulative = cumulative.saturating_add(change);

            Some(BalanceChangeEntry {
                block_number: e.block_number,
                transaction_hash: e.transaction_hash,
                timestamp: e.timestamp,
                kind,
                amount: amount.to_string(),
                counterparty,
                cumulative_balance: cumulative.to_string(),
            })
        })
        .collect();

    if limit >= 0 && entries.len() > limit as usize {
        entries.drain(..entries.len() - limit as usize);
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use chainequity_types::{Event, RawAmount};
    use serde_json::json;

    use super::*;

    fn transfer_amount(block: u64, log_index: u64, from: &str, to: &str, amount: u64) -> Event {
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

    fn transfer(from: &str, to: &str) -> Event {
        transfer_amount(1, 0, from, to, 1)
    }

    #[tokio::test]
    async fn classifies_mint_sent_and_received() {
        let store = Store::connect("sqlite::memory:").await.unwrap();
        let alice = "0x1111111111111111111111111111111111111111";
        let bob = "0x2222222222222222222222222222222222222222";

        let mut mint = transfer(Address::ZERO, alice);
        mint.log_index = 0;
        store.insert_event(&mint).await.unwrap();

        let mut sent = transfer(alice, bob);
        sent.block_number = 2;
        sent.log_index = 1;
        store.insert_event(&sent).await.unwrap();

        let history = balance_change_history(&store, alice, 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().any(|h| h.kind == BalanceChangeKind::Mint));
        assert!(history.iter().any(|h| h.kind == BalanceChangeKind::TransferSent));

        let bob_history = balance_change_history(&store, bob, 10).await.unwrap();
        assert_eq!(bob_history.len(), 1);
        assert_eq!(bob_history[0].kind, BalanceChangeKind::TransferReceived);
    }

    #[tokio::test]
    async fn self_transfer_reported_once() {
        let store = Store::connect("sqlite::memory:").await.unwrap();
        let alice = "0x1111111111111111111111111111111111111111";
        store.insert_event(&transfer(alice, alice)).await.unwrap();

        let history = balance_change_history(&store, alice, 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind, BalanceChangeKind::SelfTransfer);
    }

    /// Events come back from the store descending; the history must be
    /// re-sorted ascending and carry a running cumulative balance that
    /// reflects the full mint → send → receive trajectory, not just the
    /// relative order of the raw rows (spec §4.5).
    #[tokio::test]
    async fn ascending_order_with_correct_cumulative_balance() {
        let store = Store::connect("sqlite::memory:").await.unwrap();
        let alice = "0x1111111111111111111111111111111111111111";
        let bob = "0x2222222222222222222222222222222222222222";

        store.insert_event(&transfer_amount(1, 0, Address::ZERO, alice, 1_000)).await.unwrap();
        store.insert_event(&transfer_amount(2, 0, alice, bob, 400)).await.unwrap();
        store.insert_event(&transfer_amount(3, 0, bob, alice, 100)).await.unwrap();

        let history = balance_change_history(&store, alice, 10).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].block_number, 1);
        assert_eq!(history[1].block_number, 2);
        assert_eq!(history[2].block_number, 3);

        assert_eq!(history[0].kind, BalanceChangeKind::Mint);
        assert_eq!(history[0].cumulative_balance, "1000");
        assert_eq!(history[1].kind, BalanceChangeKind::TransferSent);
        assert_eq!(history[1].cumulative_balance, "600");
        assert_eq!(history[2].kind, BalanceChangeKind::TransferReceived);
        assert_eq!(history[2].cumulative_balance, "700");
    }

    /// A `limit` smaller than the address's full history must still produce
    /// a correct cumulative balance on the entries it returns — the limit
    /// truncates to the most recent events only *after* the running total is
    /// folded over the complete history, not before.
    #[tokio::test]
    async fn limit_truncates_after_cumulative_balance_is_computed() {
        let store = Store::connect("sqlite::memory:").await.unwrap();
        let alice = "0x1111111111111111111111111111111111111111";
        let bob = "0x2222222222222222222222222222222222222222";

        store.insert_event(&transfer_amount(1, 0, Address::ZERO, alice, 1_000)).await.unwrap();
        store.insert_event(&transfer_amount(2, 0, alice, bob, 400)).await.unwrap();
        store.insert_event(&transfer_amount(3, 0, bob, alice, 100)).await.unwrap();

        let history = balance_change_history(&store, alice, 1).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].block_number, 3);
        assert_eq!(history[0].cumulative_balance, "700");
    }
}
