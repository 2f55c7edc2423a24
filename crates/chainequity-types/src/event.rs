use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{Address, RawAmount};

/// The seven on-chain event signatures the decoder recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum EventType {
    Transfer,
    WalletApproved,
    WalletRevoked,
    StockSplit,
    SymbolChanged,
    NameChanged,
    TransferBlocked,
}

/// Corporate-action kinds recorded in the `corporate_actions` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum ActionType {
    StockSplit,
    SymbolChange,
    NameChange,
}

/// An observed on-chain log attributable to the tracked contract. `id` is
/// assigned by the store on insert; a freshly decoded event that hasn't
/// been persisted yet carries `id: None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Option<i64>,
    pub block_number: u64,
    pub transaction_hash: String,
    pub log_index: u64,
    pub event_type: EventType,
    pub from_address: Option<Address>,
    pub to_address: Option<Address>,
    pub amount: Option<RawAmount>,
    pub data: serde_json::Value,
    pub gas_used: Option<String>,
    pub gas_price: Option<String>,
    pub timestamp: u64,
}

/// Cached current balance per holder. `balance` is the pre-multiplier,
/// contract-internal-storage-unit value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub address: Address,
    pub balance: RawAmount,
    pub last_updated_block: u64,
    pub last_updated_timestamp: u64,
}

/// A durable record of a split, symbol change, or name change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorporateAction {
    pub id: Option<i64>,
    pub action_type: ActionType,
    pub block_number: u64,
    pub transaction_hash: String,
    pub old_value: String,
    pub new_value: String,
    pub timestamp: u64,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn event_type_round_trips_through_display_and_parse() {
        for ty in [
            EventType::Transfer,
            EventType::WalletApproved,
            EventType::WalletRevoked,
            EventType::StockSplit,
            EventType::SymbolChanged,
            EventType::NameChanged,
            EventType::TransferBlocked,
        ] {
            let rendered = ty.to_string();
            assert_eq!(EventType::from_str(&rendered).unwrap(), ty);
        }
    }
}
