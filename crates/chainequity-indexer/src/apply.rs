use chainequity_chain::ChainClient;
use chainequity_decoder::DecodedEvent;
use chainequity_store::{Store, StoreTransaction};
use chainequity_types::{ActionType, Address, Balance, CorporateAction, Event, EventType, RawAmount, BASIS_POINTS};

use crate::error::IndexerError;

const SPLIT_MULTIPLIER_KEY: &str = "split_multiplier";

/// Reads the running cumulative split multiplier, defaulting to
/// `BASIS_POINTS` (i.e. 1.0x) for a contract that has never split.
pub async fn current_split_multiplier_bps(store: &Store) -> Result<u64, IndexerError> {
    match store.get_metadata(SPLIT_MULTIPLIER_KEY).await? {
        Some(raw) => raw.parse().map_err(|_| {
            IndexerError::Store(chainequity_store::StoreError::Corrupt(format!(
                "non-numeric {SPLIT_MULTIPLIER_KEY}: {raw}"
            )))
        }),
        None => Ok(BASIS_POINTS),
    }
}

/// Everything a decoded event needs written to the store, computed ahead of
/// time so the transaction that finally writes it never awaits an RPC call.
pub struct PreparedEvent {
    event: Event,
    balance_updates: Vec<Balance>,
    corporate_action: Option<CorporateAction>,
    metadata_updates: Vec<(&'static str, String)>,
}

/// Attaches block timestamp and (best-effort) gas fields to a decoded event,
/// resolves its side effects against the chain and the in-flight split
/// multiplier (`CallView`s for `Transfer`, the running multiplier for
/// `StockSplit`), and returns a value ready to be written inside a single
/// sync-pass transaction.
///
/// `multiplier_bps` is the multiplier as of the *previous* event in this same
/// sync pass, not a fresh read from the store: none of the pass's writes are
/// visible until the whole batch commits, so a second `StockSplit` (or any
/// `Transfer` after one) in the same pass would otherwise see the stale
/// pre-split value. Returns the multiplier to use for the next event alongside
/// the prepared write.
pub async fn prepare_decoded_event(
    chain: &dyn ChainClient,
    multiplier_bps: u64,
    decoded: DecodedEvent,
    block_timestamp: u64,
    gas_used: Option<String>,
    gas_price: Option<String>,
) -> Result<(PreparedEvent, u64), IndexerError> {
    let event = Event {
        id: None,
        block_number: decoded.block_number,
        transaction_hash: decoded.transaction_hash.clone(),
        log_index: decoded.log_index,
        event_type: decoded.event_type,
        from_address: decoded.from_address.clone(),
        to_address: decoded.to_address.clone(),
        amount: decoded.amount.clone(),
        data: decoded.data.clone(),
        gas_used,
        gas_price,
        timestamp: block_timestamp,
    };

    let mut balance_updates = Vec::new();
    let mut corporate_action = None;
    let mut metadata_updates = Vec::new();
    let mut next_multiplier_bps = multiplier_bps;

    match decoded.event_type {
        EventType::Transfer => {
            for address in [&decoded.from_address, &decoded.to_address].into_iter().flatten() {
                if address.is_zero() {
                    continue;
                }
                balance_updates.push(
                    fetch_balance(chain, multiplier_bps, address, decoded.block_number, block_timestamp).await?,
                );
            }
        }
        EventType::TransferBlocked | EventType::WalletApproved | EventType::WalletRevoked => {
            // No balance movement: a blocked transfer never settled, and
            // approval state lives on-chain, not in the cap table.
        }
        EventType::StockSplit => {
            let new_cumulative = decoded
                .data
                .get("new_cumulative_multiplier")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();

            next_multiplier_bps = new_cumulative.parse().map_err(|_| {
                IndexerError::Store(chainequity_store::StoreError::Corrupt(format!(
                    "non-numeric new_cumulative_multiplier: {new_cumulative}"
                )))
            })?;

            metadata_updates.push((SPLIT_MULTIPLIER_KEY, new_cumulative.clone()));
            corporate_action = Some(CorporateAction {
                id: None,
                action_type: ActionType::StockSplit,
                block_number: decoded.block_number,
                transaction_hash: decoded.transaction_hash.clone(),
                old_value: multiplier_bps.to_string(),
                new_value: new_cumulative,
                timestamp: block_timestamp,
            });
        }
        EventType::SymbolChanged => {
            let old_value = decoded.data.get("old_symbol").and_then(|v| v.as_str()).unwrap_or_default();
            let new_value = decoded.data.get("new_symbol").and_then(|v| v.as_str()).unwrap_or_default();
            metadata_updates.push(("token_symbol", new_value.to_string()));
            corporate_action = Some(CorporateAction {
                id: None,
                action_type: ActionType::SymbolChange,
                block_number: decoded.block_number,
                transaction_hash: decoded.transaction_hash.clone(),
                old_value: old_value.to_string(),
                new_value: new_value.to_string(),
                timestamp: block_timestamp,
            });
        }
        EventType::NameChanged => {
            let old_value = decoded.data.get("old_name").and_then(|v| v.as_str()).unwrap_or_default();
            let new_value = decoded.data.get("new_name").and_then(|v| v.as_str()).unwrap_or_default();
            metadata_updates.push(("token_name", new_value.to_string()));
            corporate_action = Some(CorporateAction {
                id: None,
                action_type: ActionType::NameChange,
                block_number: decoded.block_number,
                transaction_hash: decoded.transaction_hash.clone(),
                old_value: old_value.to_string(),
                new_value: new_value.to_string(),
                timestamp: block_timestamp,
            });
        }
    }

    Ok((
        PreparedEvent { event, balance_updates, corporate_action, metadata_updates },
        next_multiplier_bps,
    ))
}

/// Writes a prepared event's event row, balance upserts, corporate action,
/// and metadata updates through the given transaction. Called once per log
/// inside the sync pass's single commit.
pub async fn apply_prepared_event(
    tx: &mut StoreTransaction<'_>,
    prepared: PreparedEvent,
) -> Result<(), IndexerError> {
    tx.insert_event(&prepared.event).await?;

    for balance in &prepared.balance_updates {
        tx.upsert_balance(balance).await?;
    }

    if let Some(action) = &prepared.corporate_action {
        tx.insert_corporate_action(action).await?;
    }

    for (key, value) in &prepared.metadata_updates {
        tx.set_metadata(key, value).await?;
    }

    Ok(())
}

/// Reads address `addr`'s authoritative on-chain (display) balance and
/// converts it to the pre-multiplier raw unit the store caches, so a
/// `StockSplit` never requires rewriting existing `Balance` rows.
async fn fetch_balance(
    chain: &dyn ChainClient,
    multiplier_bps: u64,
    addr: &Address,
    block_number: u64,
    timestamp: u64,
) -> Result<Balance, IndexerError> {
    let on_chain_address: alloy_primitives::Address = addr
        .as_str()
        .parse()
        .map_err(|_| IndexerError::Store(chainequity_store::StoreError::Corrupt(addr.as_str().to_string())))?;

    let on_chain_display = chain.balance_of(on_chain_address).await?;
    let raw = RawAmount::from_display_units(on_chain_display, multiplier_bps);

    Ok(Balance {
        address: addr.clone(),
        balance: raw,
        last_updated_block: block_number,
        last_updated_timestamp: timestamp,
    })
}
