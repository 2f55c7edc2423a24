use alloy_primitives::U256;
use chainequity_store::Store;
use chainequity_types::{BASIS_POINTS, TOKEN_DECIMALS};

use crate::{
    error::CapTableError,
    multiplier::current_split_multiplier_bps,
    types::{CapTableEntry, CapTableSnapshot},
};

/// Builds the cap table from cached balances. No chain access: every value
/// here is already in the store. `balance`/`totalSupplyFormatted` are plain
/// decimal renderings of the raw, pre-multiplier units (`raw / 10^decimals`)
/// — consumers apply `splitMultiplier` themselves when displaying.
/// Ownership percentages are likewise computed from the raw values, so a
/// split never moves anyone's percentage.
pub async fn current_snapshot(store: &Store) -> Result<CapTableSnapshot, CapTableError> {
    let multiplier_bps = current_split_multiplier_bps(store).await?;
    let balances = store.get_all_balances(None).await?;
    let block_number = store.highest_indexed_block().await?.unwrap_or(0);

    let mut timestamp = 0u64;
    let mut entries: Vec<(String, U256, u64)> = Vec::with_capacity(balances.len());
    let mut total_raw_supply = U256::ZERO;

    for balance in &balances {
        let raw = balance.balance.as_u256();
        if raw.is_zero() {
            continue;
        }
        total_raw_supply = total_raw_supply.saturating_add(raw);
        timestamp = timestamp.max(balance.last_updated_timestamp);
        entries.push((balance.address.as_str().to_string(), raw, balance.last_updated_timestamp));
    }

    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let holders: Vec<CapTableEntry> = entries
        .into_iter()
        .map(|(address, raw, last_updated)| CapTableEntry {
            percentage: percentage_of(raw, total_raw_supply),
            balance: format_with_decimals(raw),
            raw_balance: raw.to_string(),
            last_updated: Some(last_updated),
            address,
        })
        .collect();

    Ok(CapTableSnapshot {
        block_number,
        timestamp,
        total_supply: total_raw_supply.to_string(),
        total_supply_formatted: format_with_decimals(total_raw_supply),
        split_multiplier: multiplier_bps as f64 / BASIS_POINTS as f64,
        holder_count: holders.len(),
        holders,
    })
}

pub(crate) fn percentage_of(part: U256, whole: U256) -> f64 {
    if whole.is_zero() {
        return 0.0;
    }
    (u256_to_f64(part) / u256_to_f64(whole)) * 100.0
}

pub(crate) fn u256_to_f64(value: U256) -> f64 {
    value.to_string().parse::<f64>().unwrap_or(f64::MAX)
}

/// `raw / 10^decimals`, rendered as a decimal string. Deliberately does not
/// apply the split multiplier — consumers do that themselves at display
/// time.
pub(crate) fn format_with_decimals(raw: U256) -> String {
    let divisor = U256::from(10u64).pow(U256::from(TOKEN_DECIMALS));
    raw.wrapping_div(divisor).to_string()
}

#[cfg(test)]
mod tests {
    use chainequity_types::{Address, Balance, RawAmount};

    use super::*;

    #[tokio::test]
    async fn empty_store_yields_empty_snapshot() {
        let store = Store::connect("sqlite::memory:").await.unwrap();
        let snapshot = current_snapshot(&store).await.unwrap();
        assert_eq!(snapshot.holder_count, 0);
        assert_eq!(snapshot.total_supply, "0");
        assert_eq!(snapshot.split_multiplier, 1.0);
    }

    #[tokio::test]
    async fn single_holder_mint_yields_full_ownership() {
        let store = Store::connect("sqlite::memory:").await.unwrap();
        let alice = Address::parse("0x1111111111111111111111111111111111111111").unwrap();

        store
            .upsert_balance(&Balance {
                address: alice.clone(),
                balance: RawAmount::parse("1000000000000000000000").unwrap(),
                last_updated_block: 10,
                last_updated_timestamp: 1_700_000_010,
            })
            .await
            .unwrap();

        let snapshot = current_snapshot(&store).await.unwrap();
        assert_eq!(snapshot.total_supply, "1000000000000000000000");
        assert_eq!(snapshot.total_supply_formatted, "1000");
        assert_eq!(snapshot.holder_count, 1);
        assert_eq!(snapshot.holders[0].percentage, 100.0);
        assert_eq!(snapshot.holders[0].balance, "1000");
    }

    #[tokio::test]
    async fn zero_balances_are_excluded() {
        let store = Store::connect("sqlite::memory:").await.unwrap();
        let dust = Address::parse("0x3333333333333333333333333333333333333333").unwrap();

        store
            .upsert_balance(&Balance {
                address: dust,
                balance: RawAmount::ZERO,
                last_updated_block: 1,
                last_updated_timestamp: 1,
            })
            .await
            .unwrap();

        let snapshot = current_snapshot(&store).await.unwrap();
        assert_eq!(snapshot.holder_count, 0);
    }
}
