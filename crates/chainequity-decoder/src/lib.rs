//! A pure `RawLog -> Option<DecodedEvent>` mapping. No I/O, no retries, no
//! chain access — unrecognized topics are silently ignored rather than
//! treated as errors.

mod error;

pub use error::DecodeError;

use alloy_sol_types::SolEvent;
use chainequity_chain::{IEquityToken, RawLog};
use chainequity_types::{Address, EventType, RawAmount};
use serde_json::json;

/// The decoder's output: everything derivable from the log itself. The
/// indexer attaches `timestamp` (from the block) and gas fields (from the
/// receipt, best-effort) before persisting this as a `chainequity_types::Event`.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEvent {
    pub block_number: u64,
    pub transaction_hash: String,
    pub log_index: u64,
    pub event_type: EventType,
    pub from_address: Option<Address>,
    pub to_address: Option<Address>,
    pub amount: Option<RawAmount>,
    pub data: serde_json::Value,
}

/// Decode a single log emitted by the tracked contract. Returns `Ok(None)`
/// for any topic0 that doesn't match one of the seven known event
/// signatures.
pub fn decode_log(log: &RawLog) -> Result<Option<DecodedEvent>, DecodeError> {
    let Some(&topic0) = log.topics.first() else {
        return Ok(None);
    };

    let transaction_hash = format!("{:#x}", log.transaction_hash);

    let decoded = if topic0 == IEquityToken::Transfer::SIGNATURE_HASH {
        let ev = IEquityToken::Transfer::decode_raw_log(log.topics.iter().copied(), &log.data, true)
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;
        DecodedEvent {
            block_number: log.block_number,
            transaction_hash,
            log_index: log.log_index,
            event_type: EventType::Transfer,
            from_address: Some(Address::from(ev.from)),
            to_address: Some(Address::from(ev.to)),
            amount: Some(RawAmount::from_u256(ev.value)),
            data: json!({}),
        }
    } else if topic0 == IEquityToken::WalletApproved::SIGNATURE_HASH {
        let ev = IEquityToken::WalletApproved::decode_raw_log(log.topics.iter().copied(), &log.data, true)
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;
        DecodedEvent {
            block_number: log.block_number,
            transaction_hash,
            log_index: log.log_index,
            event_type: EventType::WalletApproved,
            from_address: Some(Address::from(ev.wallet)),
            to_address: None,
            amount: None,
            data: json!({}),
        }
    } else if topic0 == IEquityToken::WalletRevoked::SIGNATURE_HASH {
        let ev = IEquityToken::WalletRevoked::decode_raw_log(log.topics.iter().copied(), &log.data, true)
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;
        DecodedEvent {
            block_number: log.block_number,
            transaction_hash,
            log_index: log.log_index,
            event_type: EventType::WalletRevoked,
            from_address: Some(Address::from(ev.wallet)),
            to_address: None,
            amount: None,
            data: json!({}),
        }
    } else if topic0 == IEquityToken::StockSplit::SIGNATURE_HASH {
        let ev = IEquityToken::StockSplit::decode_raw_log(log.topics.iter().copied(), &log.data, true)
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;
        DecodedEvent {
            block_number: log.block_number,
            transaction_hash,
            log_index: log.log_index,
            event_type: EventType::StockSplit,
            from_address: None,
            to_address: None,
            amount: None,
            data: json!({
                "multiplier": ev.multiplier.to_string(),
                "new_cumulative_multiplier": ev.newCumulativeMultiplier.to_string(),
            }),
        }
    } else if topic0 == IEquityToken::SymbolChanged::SIGNATURE_HASH {
        let ev = IEquityToken::SymbolChanged::decode_raw_log(log.topics.iter().copied(), &log.data, true)
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;
        DecodedEvent {
            block_number: log.block_number,
            transaction_hash,
            log_index: log.log_index,
            event_type: EventType::SymbolChanged,
            from_address: None,
            to_address: None,
            amount: None,
            data: json!({ "old_symbol": ev.oldSymbol, "new_symbol": ev.newSymbol }),
        }
    } else if topic0 == IEquityToken::NameChanged::SIGNATURE_HASH {
        let ev = IEquityToken::NameChanged::decode_raw_log(log.topics.iter().copied(), &log.data, true)
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;
        DecodedEvent {
            block_number: log.block_number,
            transaction_hash,
            log_index: log.log_index,
            event_type: EventType::NameChanged,
            from_address: None,
            to_address: None,
            amount: None,
            data: json!({ "old_name": ev.oldName, "new_name": ev.newName }),
        }
    } else if topic0 == IEquityToken::TransferBlocked::SIGNATURE_HASH {
        let ev = IEquityToken::TransferBlocked::decode_raw_log(log.topics.iter().copied(), &log.data, true)
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;
        DecodedEvent {
            block_number: log.block_number,
            transaction_hash,
            log_index: log.log_index,
            event_type: EventType::TransferBlocked,
            from_address: Some(Address::from(ev.from)),
            to_address: Some(Address::from(ev.to)),
            amount: Some(RawAmount::from_u256(ev.amount)),
            data: json!({}),
        }
    } else {
        return Ok(None);
    };

    Ok(Some(decoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address as AlloyAddress, B256, U256};

    fn raw_log_from_sol_event<E: SolEvent>(
        event: &E,
        block_number: u64,
        log_index: u64,
    ) -> RawLog {
        let log_data = event.encode_log_data();
        RawLog {
            address: AlloyAddress::ZERO,
            topics: log_data.topics().to_vec(),
            data: log_data.data.to_vec(),
            block_number,
            transaction_hash: B256::repeat_byte(0xab),
            log_index,
        }
    }

    #[test]
    fn decodes_transfer_event() {
        let from = AlloyAddress::repeat_byte(0x11);
        let to = AlloyAddress::repeat_byte(0x22);
        let ev = IEquityToken::Transfer { from, to, value: U256::from(1_000u64) };
        let log = raw_log_from_sol_event(&ev, 100, 3);

        let decoded = decode_log(&log).unwrap().expect("should decode");
        assert_eq!(decoded.event_type, EventType::Transfer);
        assert_eq!(decoded.from_address.unwrap().as_str(), format!("{from:#x}"));
        assert_eq!(decoded.to_address.unwrap().as_str(), format!("{to:#x}"));
        assert_eq!(decoded.amount.unwrap().as_u256(), U256::from(1_000u64));
    }

    #[test]
    fn decodes_stock_split_event_into_data_payload() {
        let ev = IEquityToken::StockSplit {
            multiplier: U256::from(20_000u64),
            newCumulativeMultiplier: U256::from(20_000u64),
        };
        let log = raw_log_from_sol_event(&ev, 200, 0);

        let decoded = decode_log(&log).unwrap().expect("should decode");
        assert_eq!(decoded.event_type, EventType::StockSplit);
        assert_eq!(decoded.data["multiplier"], "20000");
        assert_eq!(decoded.data["new_cumulative_multiplier"], "20000");
    }

    #[test]
    fn unknown_topic_is_ignored_not_an_error() {
        let log = RawLog {
            address: AlloyAddress::ZERO,
            topics: vec![B256::repeat_byte(0xff)],
            data: vec![],
            block_number: 1,
            transaction_hash: B256::repeat_byte(0x01),
            log_index: 0,
        };

        assert!(decode_log(&log).unwrap().is_none());
    }

    #[test]
    fn log_with_no_topics_is_ignored() {
        let log = RawLog {
            address: AlloyAddress::ZERO,
            topics: vec![],
            data: vec![],
            block_number: 1,
            transaction_hash: B256::repeat_byte(0x01),
            log_index: 0,
        };

        assert!(decode_log(&log).unwrap().is_none());
    }
}
