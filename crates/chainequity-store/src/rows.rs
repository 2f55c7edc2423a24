use std::str::FromStr;

use chainequity_types::{ActionType, Address, Balance, CorporateAction, Event, EventType, RawAmount};

use crate::error::StoreError;

/// Raw row shape returned by sqlx for the `events` table. Kept separate from
/// `chainequity_types::Event` because the wire/domain type stores typed
/// addresses and amounts, while SQLite only ever gives us back strings.
#[derive(Debug, sqlx::FromRow)]
pub struct EventRow {
    pub id: i64,
    pub block_number: i64,
    pub transaction_hash: String,
    pub log_index: i64,
    pub event_type: String,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub amount: Option<String>,
    pub data: String,
    pub gas_used: Option<String>,
    pub gas_price: Option<String>,
    pub timestamp: i64,
}

impl TryFrom<EventRow> for Event {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let event_type = EventType::from_str(&row.event_type)
            .map_err(|_| StoreError::Corrupt(format!("unknown event_type: {}", row.event_type)))?;
        let from_address = row
            .from_address
            .map(|a| Address::parse(&a))
            .transpose()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let to_address = row
            .to_address
            .map(|a| Address::parse(&a))
            .transpose()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let amount = row
            .amount
            .map(|a| RawAmount::parse(&a))
            .transpose()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let data = serde_json::from_str(&row.data)
            .map_err(|e| StoreError::Corrupt(format!("malformed data json: {e}")))?;

        Ok(Event {
            id: Some(row.id),
            block_number: row.block_number as u64,
            transaction_hash: row.transaction_hash,
            log_index: row.log_index as u64,
            event_type,
            from_address,
            to_address,
            amount,
            data,
            gas_used: row.gas_used,
            gas_price: row.gas_price,
            timestamp: row.timestamp as u64,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct BalanceRow {
    pub address: String,
    pub balance: String,
    pub last_updated_block: i64,
    pub last_updated_timestamp: i64,
}

impl TryFrom<BalanceRow> for Balance {
    type Error = StoreError;

    fn try_from(row: BalanceRow) -> Result<Self, Self::Error> {
        Ok(Balance {
            address: Address::parse(&row.address).map_err(|e| StoreError::Corrupt(e.to_string()))?,
            balance: RawAmount::parse(&row.balance).map_err(|e| StoreError::Corrupt(e.to_string()))?,
            last_updated_block: row.last_updated_block as u64,
            last_updated_timestamp: row.last_updated_timestamp as u64,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct CorporateActionRow {
    pub id: i64,
    pub action_type: String,
    pub block_number: i64,
    pub transaction_hash: String,
    pub old_value: String,
    pub new_value: String,
    pub timestamp: i64,
}

impl TryFrom<CorporateActionRow> for CorporateAction {
    type Error = StoreError;

    fn try_from(row: CorporateActionRow) -> Result<Self, Self::Error> {
        let action_type = ActionType::from_str(&row.action_type)
            .map_err(|_| StoreError::Corrupt(format!("unknown action_type: {}", row.action_type)))?;

        Ok(CorporateAction {
            id: Some(row.id),
            action_type,
            block_number: row.block_number as u64,
            transaction_hash: row.transaction_hash,
            old_value: row.old_value,
            new_value: row.new_value,
            timestamp: row.timestamp as u64,
        })
    }
}
