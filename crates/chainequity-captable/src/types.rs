use serde::Serialize;

/// One holder's position within a snapshot. `raw_balance` is the
/// stored pre-multiplier unit; `balance` is its plain decimal rendering
/// (`raw / 10^decimals`) with no split multiplier applied — consumers apply
/// `CapTableSnapshot::split_multiplier` themselves when displaying.
/// `percentage` is computed from the raw values, so it is unaffected by
/// which unit is displayed or whether a split has occurred.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapTableEntry {
    pub address: String,
    pub raw_balance: String,
    #[serde(rename = "balanceFormatted")]
    pub balance: String,
    #[serde(rename = "ownershipPercentage")]
    pub percentage: f64,
    /// `Some` for the current snapshot (the cached balance row's own
    /// update time); `None` for a historical snapshot, which has no
    /// per-holder timestamp to report.
    pub last_updated: Option<u64>,
}

/// `totalSupply` is the raw big-integer sum, `totalSupplyFormatted`
/// divides it by `10^decimals` (no multiplier applied); `splitMultiplier` is
/// the cumulative multiplier as a float, for consumers to apply themselves.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapTableSnapshot {
    pub block_number: u64,
    pub timestamp: u64,
    pub total_supply: String,
    pub total_supply_formatted: String,
    pub split_multiplier: f64,
    pub holder_count: usize,
    pub holders: Vec<CapTableEntry>,
}

/// A single address's balance-changing event, classified from that
/// address's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceChangeKind {
    /// `from == to == A`: balance is unaffected but the event is still
    /// attributable to A's history.
    SelfTransfer,
    TransferSent,
    TransferReceived,
    /// `from` is the zero address.
    Mint,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceChangeEntry {
    pub block_number: u64,
    pub transaction_hash: String,
    pub timestamp: u64,
    pub kind: BalanceChangeKind,
    pub amount: String,
    pub counterparty: Option<String>,
    /// The address's running balance immediately after this event, computed
    /// by folding each entry's signed `change` (0 for `SelfTransfer`,
    /// `-amount` for `TransferSent`, `+amount` for `Mint`/`TransferReceived`)
    /// over the ascending event order.
    pub cumulative_balance: String,
}
