use serde::Serialize;

use crate::types::CapTableSnapshot;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionBucket {
    pub label: &'static str,
    pub holder_count: usize,
    pub total_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsOverview {
    pub holder_count: usize,
    pub mean_balance: f64,
    pub median_balance: f64,
    pub top_10_concentration_pct: f64,
    pub hhi: f64,
    pub gini: f64,
    pub decentralization_score: f64,
    pub concentration_category: &'static str,
}

/// Buckets holders by share of total supply into fixed percentage ranges.
/// Every holder falls into exactly one bucket; a holder that owns 0% of
/// supply never reaches this function (the snapshot already excludes
/// zero balances).
pub fn distribution_buckets(snapshot: &CapTableSnapshot) -> Vec<DistributionBucket> {
    const RANGES: [(f64, f64, &str); 5] = [
        (10.0, f64::INFINITY, "10-100%"),
        (1.0, 10.0, "1-10%"),
        (0.1, 1.0, "0.1-1%"),
        (0.01, 0.1, "0.01-0.1%"),
        (0.0, 0.01, "0-0.01%"),
    ];

    RANGES
        .iter()
        .map(|&(min, max, label)| {
            // Half-open on the bottom, closed on the top of the bracket
            // except the top bracket's open-ended `INFINITY` — a holder at
            // exactly the boundary belongs to the higher bucket.
            let holders: Vec<_> = snapshot
                .holders
                .iter()
                .filter(|h| h.percentage >= min && (h.percentage < max || max.is_infinite()))
                .collect();

            DistributionBucket {
                label,
                holder_count: holders.len(),
                total_percentage: holders.iter().map(|h| h.percentage).sum(),
            }
        })
        .collect()
}

/// Mean of `rawBalance` across holders.
pub fn mean_balance(snapshot: &CapTableSnapshot) -> f64 {
    if snapshot.holders.is_empty() {
        return 0.0;
    }
    let sum: f64 = snapshot.holders.iter().map(|h| parse_balance(&h.raw_balance)).sum();
    sum / snapshot.holders.len() as f64
}

/// Median of `rawBalance` across holders, sorted ascending; the mean of the
/// two middle values when the holder count is even.
pub fn median_balance(snapshot: &CapTableSnapshot) -> f64 {
    if snapshot.holders.is_empty() {
        return 0.0;
    }
    let mut balances: Vec<f64> = snapshot.holders.iter().map(|h| parse_balance(&h.raw_balance)).collect();
    balances.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let mid = balances.len() / 2;
    if balances.len() % 2 == 0 {
        (balances[mid - 1] + balances[mid]) / 2.0
    } else {
        balances[mid]
    }
}

/// Sum of the top `n` holders' percentage of supply. `n = 10` is the
/// standard "top-10 concentration" figure.
pub fn top_n_concentration(snapshot: &CapTableSnapshot, n: usize) -> f64 {
    snapshot.holders.iter().take(n).map(|h| h.percentage).sum()
}

/// Herfindahl-Hirschman Index on ownership shares expressed in `[0,1]`:
/// `Σ (share_i)²`, which is itself bounded to `[0,1]`. A single holder
/// owning 100% yields `1.0`.
pub fn herfindahl_hirschman_index(snapshot: &CapTableSnapshot) -> f64 {
    snapshot
        .holders
        .iter()
        .map(|h| {
            let share = h.percentage / 100.0;
            share * share
        })
        .sum()
}

/// Gini coefficient over holder raw balances, computed via the standard
/// mean-absolute-difference formula. 0 = perfect equality, 1 = maximal
/// concentration.
pub fn gini_coefficient(snapshot: &CapTableSnapshot) -> f64 {
    let n = snapshot.holders.len();
    if n < 2 {
        return 0.0;
    }

    let mut balances: Vec<f64> = snapshot.holders.iter().map(|h| parse_balance(&h.raw_balance)).collect();
    balances.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let sum: f64 = balances.iter().sum();
    if sum == 0.0 {
        return 0.0;
    }

    let weighted_sum: f64 = balances
        .iter()
        .enumerate()
        .map(|(i, balance)| (i as f64 + 1.0) * balance)
        .sum();

    (2.0 * weighted_sum) / (n as f64 * sum) - (n as f64 + 1.0) / n as f64
}

/// `clip(0,100, 100 · (1 − HHI) · (1 − Gini) · min(1, n/100))`. Because the
/// three factors multiply, an evenly distributed cap table with fewer than
/// 100 holders can never reach 100 — `breadth_factor` alone caps it below 1.
/// This is intentional, not a bug.
pub fn decentralization_score(snapshot: &CapTableSnapshot) -> f64 {
    if snapshot.holders.is_empty() {
        return 0.0;
    }

    let equality_factor = 1.0 - gini_coefficient(snapshot);
    let concentration_factor = 1.0 - herfindahl_hirschman_index(snapshot);
    let breadth_factor = (snapshot.holder_count as f64 / 100.0).min(1.0);

    (100.0 * concentration_factor * equality_factor * breadth_factor).clamp(0.0, 100.0)
}

/// HHI thresholds on the `[0,1]` share scale: unconcentrated below 0.15,
/// moderately concentrated below 0.25, else highly concentrated.
pub fn concentration_category(hhi: f64) -> &'static str {
    if hhi < 0.15 {
        "low"
    } else if hhi < 0.25 {
        "moderate"
    } else {
        "high"
    }
}

pub fn overview(snapshot: &CapTableSnapshot) -> AnalyticsOverview {
    let hhi = herfindahl_hirschman_index(snapshot);
    AnalyticsOverview {
        holder_count: snapshot.holder_count,
        mean_balance: mean_balance(snapshot),
        median_balance: median_balance(snapshot),
        top_10_concentration_pct: top_n_concentration(snapshot, 10),
        hhi,
        gini: gini_coefficient(snapshot),
        decentralization_score: decentralization_score(snapshot),
        concentration_category: concentration_category(hhi),
    }
}

fn parse_balance(raw: &str) -> f64 {
    raw.parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CapTableEntry;

    fn snapshot_with(balances: &[(&str, u64)]) -> CapTableSnapshot {
        let total: u64 = balances.iter().map(|(_, b)| b).sum();
        let mut holders: Vec<CapTableEntry> = balances
            .iter()
            .map(|(addr, bal)| CapTableEntry {
                address: addr.to_string(),
                raw_balance: bal.to_string(),
                balance: bal.to_string(),
                percentage: *bal as f64 / total as f64 * 100.0,
                last_updated: Some(1),
            })
            .collect();
        holders.sort_by(|a, b| b.percentage.partial_cmp(&a.percentage).unwrap());

        CapTableSnapshot {
            block_number: 1,
            timestamp: 1,
            total_supply: total.to_string(),
            total_supply_formatted: total.to_string(),
            split_multiplier: 1.0,
            holder_count: holders.len(),
            holders,
        }
    }

    #[test]
    fn equal_holders_have_zero_gini() {
        let snapshot = snapshot_with(&[("a", 100), ("b", 100), ("c", 100), ("d", 100)]);
        assert!(gini_coefficient(&snapshot).abs() < 1e-9);
    }

    #[test]
    fn single_holder_maximizes_concentration() {
        let snapshot = snapshot_with(&[("a", 1000)]);
        assert_eq!(herfindahl_hirschman_index(&snapshot), 1.0);
        assert_eq!(concentration_category(herfindahl_hirschman_index(&snapshot)), "high");
    }

    #[test]
    fn median_of_odd_count_is_middle_element() {
        let snapshot = snapshot_with(&[("a", 10), ("b", 20), ("c", 30)]);
        assert_eq!(median_balance(&snapshot), 20.0);
    }

    #[test]
    fn distribution_buckets_partition_holders_without_overlap() {
        let snapshot = snapshot_with(&[("a", 9_000), ("b", 500), ("c", 500)]);
        let buckets = distribution_buckets(&snapshot);
        let total_holders: usize = buckets.iter().map(|b| b.holder_count).sum();
        assert_eq!(total_holders, 3);
    }

    #[test]
    fn holder_at_exact_bucket_boundary_falls_into_higher_bucket() {
        // Exactly 10% and exactly 1% should land in the ">=10%" and
        // "[1%,10%)" buckets respectively, not the bracket below.
        let snapshot = snapshot_with(&[("a", 10), ("b", 1), ("c", 89)]);
        let buckets = distribution_buckets(&snapshot);

        // a=10% and c=89% both belong in the top bucket; b=1% belongs to
        // the bucket below, not the [0.1%,1%) bucket under it.
        let top = buckets.iter().find(|b| b.label == "10-100%").unwrap();
        assert_eq!(top.holder_count, 2);

        let mid = buckets.iter().find(|b| b.label == "1-10%").unwrap();
        assert_eq!(mid.holder_count, 1);
    }
}
