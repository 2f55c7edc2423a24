use chainequity_types::{Balance, CorporateAction, Event};
use sqlx::{sqlite::SqlitePoolOptions, Row, Sqlite, SqlitePool};

use crate::{
    error::StoreError,
    rows::{BalanceRow, CorporateActionRow, EventRow},
    schema::CREATE_TABLES,
};

/// Embedded relational store backed by a single SQLite file in WAL mode so
/// the indexer's writer and the API's readers don't block one another.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&pool)
            .await?;
        sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;
        sqlx::query(CREATE_TABLES).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Opens a transaction for a multi-write sync pass. Callers should do
    /// any RPC calls *before* opening the transaction, so no operation
    /// holds a lock across an RPC call, and only use it for the DB writes
    /// themselves.
    pub async fn begin(&self) -> Result<StoreTransaction<'_>, StoreError> {
        Ok(StoreTransaction { tx: self.pool.begin().await? })
    }

    /// Idempotent on `(transaction_hash, log_index)`. Returns
    /// the row id of the event whether it was just inserted or already
    /// existed, so callers can treat this as the single source of truth.
    pub async fn insert_event(&self, event: &Event) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT OR IGNORE INTO events
                (block_number, transaction_hash, log_index, event_type,
                 from_address, to_address, amount, data, gas_used, gas_price, timestamp)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.block_number as i64)
        .bind(&event.transaction_hash)
        .bind(event.log_index as i64)
        .bind(event.event_type.to_string())
        .bind(event.from_address.as_ref().map(|a| a.as_str().to_string()))
        .bind(event.to_address.as_ref().map(|a| a.as_str().to_string()))
        .bind(event.amount.as_ref().map(|a| a.to_string()))
        .bind(event.data.to_string())
        .bind(&event.gas_used)
        .bind(&event.gas_price)
        .bind(event.timestamp as i64)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query("SELECT id FROM events WHERE transaction_hash = ? AND log_index = ?")
            .bind(&event.transaction_hash)
            .bind(event.log_index as i64)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row.get::<i64, _>("id"))
    }

    pub async fn upsert_balance(&self, balance: &Balance) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO balances (address, balance, last_updated_block, last_updated_timestamp)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (address) DO UPDATE SET
                balance = excluded.balance,
                last_updated_block = excluded.last_updated_block,
                last_updated_timestamp = excluded.last_updated_timestamp
            "#,
        )
        .bind(balance.address.as_str())
        .bind(balance.balance.to_string())
        .bind(balance.last_updated_block as i64)
        .bind(balance.last_updated_timestamp as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_balance(&self, address: &str) -> Result<Option<Balance>, StoreError> {
        let row: Option<BalanceRow> =
            sqlx::query_as("SELECT * FROM balances WHERE address = ?")
                .bind(address)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Balance::try_from).transpose()
    }

    /// Holders with `balance > 0`, sorted by balance descending.
    /// Balances are 256-bit integers stored as decimal strings, so the
    /// ordering can't be pushed down as a plain SQL `ORDER BY` on the text
    /// column — we filter in SQL (cheap, indexed-free but index-friendly
    /// via the `!= '0'` check) and sort numerically in Rust.
    pub async fn get_all_balances(&self, limit: Option<i64>) -> Result<Vec<Balance>, StoreError> {
        let rows: Vec<BalanceRow> =
            sqlx::query_as("SELECT * FROM balances WHERE balance != '0'")
                .fetch_all(&self.pool)
                .await?;

        let mut balances = rows.into_iter().map(Balance::try_from).collect::<Result<Vec<_>, _>>()?;
        balances.sort_by(|a, b| b.balance.cmp(&a.balance).then_with(|| a.address.cmp(&b.address)));

        if let Some(limit) = limit {
            balances.truncate(limit.max(0) as usize);
        }

        Ok(balances)
    }

    pub async fn insert_corporate_action(&self, action: &CorporateAction) -> Result<i64, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO corporate_actions
                (action_type, block_number, transaction_hash, old_value, new_value, timestamp)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(action.action_type.to_string())
        .bind(action.block_number as i64)
        .bind(&action.transaction_hash)
        .bind(&action.old_value)
        .bind(&action.new_value)
        .bind(action.timestamp as i64)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get_corporate_actions(&self, limit: i64) -> Result<Vec<CorporateAction>, StoreError> {
        let rows: Vec<CorporateActionRow> =
            sqlx::query_as("SELECT * FROM corporate_actions ORDER BY block_number DESC, id DESC LIMIT ?")
                .bind(limit)
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(CorporateAction::try_from).collect()
    }

    pub async fn get_corporate_actions_by_type(
        &self,
        action_type: &str,
        limit: i64,
    ) -> Result<Vec<CorporateAction>, StoreError> {
        let rows: Vec<CorporateActionRow> = sqlx::query_as(
            "SELECT * FROM corporate_actions WHERE action_type = ? ORDER BY block_number DESC, id DESC LIMIT ?",
        )
        .bind(action_type)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CorporateAction::try_from).collect()
    }

    pub async fn set_metadata(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO metadata (key, value) VALUES (?, ?) \
             ON CONFLICT (key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_metadata(&self, key: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT value FROM metadata WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get::<String, _>("value")))
    }

    pub async fn get_events_by_block_range(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Event>, StoreError> {
        let rows: Vec<EventRow> = sqlx::query_as(
            "SELECT * FROM events WHERE block_number >= ? AND block_number <= ? \
             ORDER BY block_number ASC, log_index ASC",
        )
        .bind(from_block as i64)
        .bind(to_block as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Event::try_from).collect()
    }

    pub async fn get_events_by_type(&self, event_type: &str, limit: i64) -> Result<Vec<Event>, StoreError> {
        let rows: Vec<EventRow> = sqlx::query_as(
            "SELECT * FROM events WHERE event_type = ? ORDER BY block_number DESC, log_index DESC LIMIT ?",
        )
        .bind(event_type)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Event::try_from).collect()
    }

    pub async fn get_events_by_address(&self, address: &str, limit: i64) -> Result<Vec<Event>, StoreError> {
        let rows: Vec<EventRow> = sqlx::query_as(
            "SELECT * FROM events WHERE from_address = ? OR to_address = ? \
             ORDER BY block_number DESC, log_index DESC LIMIT ?",
        )
        .bind(address)
        .bind(address)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Event::try_from).collect()
    }

    pub async fn get_events_paginated(&self, limit: i64, offset: i64) -> Result<Vec<Event>, StoreError> {
        let rows: Vec<EventRow> = sqlx::query_as(
            "SELECT * FROM events ORDER BY block_number DESC, log_index DESC LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Event::try_from).collect()
    }

    pub async fn highest_indexed_block(&self) -> Result<Option<u64>, StoreError> {
        let row = sqlx::query("SELECT MAX(block_number) AS max_block FROM events")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get::<Option<i64>, _>("max_block").map(|b| b as u64))
    }

    /// Deletes every event and corporate action recorded at or above
    /// `from_block`, used by the indexer's reorg-recovery path. Balances are
    /// left for the caller to recompute from the remaining event log.
    pub async fn rollback_from_block(&self, from_block: u64) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM events WHERE block_number >= ?")
            .bind(from_block as i64)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM corporate_actions WHERE block_number >= ?")
            .bind(from_block as i64)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

/// A single sync pass's worth of writes: all event inserts, balance upserts,
/// corporate-action inserts, and the final `last_synced_block` metadata
/// write commit together or not at all.
pub struct StoreTransaction<'a> {
    tx: sqlx::Transaction<'a, Sqlite>,
}

impl StoreTransaction<'_> {
    pub async fn insert_event(&mut self, event: &Event) -> Result<i64, StoreError> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO events
                (block_number, transaction_hash, log_index, event_type,
                 from_address, to_address, amount, data, gas_used, gas_price, timestamp)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.block_number as i64)
        .bind(&event.transaction_hash)
        .bind(event.log_index as i64)
        .bind(event.event_type.to_string())
        .bind(event.from_address.as_ref().map(|a| a.as_str().to_string()))
        .bind(event.to_address.as_ref().map(|a| a.as_str().to_string()))
        .bind(event.amount.as_ref().map(|a| a.to_string()))
        .bind(event.data.to_string())
        .bind(&event.gas_used)
        .bind(&event.gas_price)
        .bind(event.timestamp as i64)
        .execute(&mut *self.tx)
        .await?;

        let row = sqlx::query("SELECT id FROM events WHERE transaction_hash = ? AND log_index = ?")
            .bind(&event.transaction_hash)
            .bind(event.log_index as i64)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(row.get::<i64, _>("id"))
    }

    pub async fn upsert_balance(&mut self, balance: &Balance) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO balances (address, balance, last_updated_block, last_updated_timestamp)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (address) DO UPDATE SET
                balance = excluded.balance,
                last_updated_block = excluded.last_updated_block,
                last_updated_timestamp = excluded.last_updated_timestamp
            "#,
        )
        .bind(balance.address.as_str())
        .bind(balance.balance.to_string())
        .bind(balance.last_updated_block as i64)
        .bind(balance.last_updated_timestamp as i64)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    pub async fn insert_corporate_action(&mut self, action: &CorporateAction) -> Result<i64, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO corporate_actions
                (action_type, block_number, transaction_hash, old_value, new_value, timestamp)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(action.action_type.to_string())
        .bind(action.block_number as i64)
        .bind(&action.transaction_hash)
        .bind(&action.old_value)
        .bind(&action.new_value)
        .bind(action.timestamp as i64)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn set_metadata(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO metadata (key, value) VALUES (?, ?) \
             ON CONFLICT (key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    pub async fn get_metadata(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT value FROM metadata WHERE key = ?")
            .bind(key)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(row.map(|r| r.get::<String, _>("value")))
    }

    pub async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chainequity_types::{Address, EventType, RawAmount};
    use serde_json::json;

    use super::*;

    async fn memory_store() -> Store {
        Store::connect("sqlite::memory:").await.expect("in-memory store")
    }

    fn sample_event(log_index: u64) -> Event {
        Event {
            id: None,
            block_number: 10,
            transaction_hash: "0xabc".into(),
            log_index,
            event_type: EventType::Transfer,
            from_address: Some(Address::parse("0x1111111111111111111111111111111111111111").unwrap()),
            to_address: Some(Address::parse("0x2222222222222222222222222222222222222222").unwrap()),
            amount: Some(RawAmount::parse("1000").unwrap()),
            data: json!({}),
            gas_used: None,
            gas_price: None,
            timestamp: 1_700_000_000,
        }
    }

    #[tokio::test]
    async fn insert_event_is_idempotent_on_tx_hash_and_log_index() {
        let store = memory_store().await;
        let event = sample_event(0);

        let first_id = store.insert_event(&event).await.unwrap();
        let second_id = store.insert_event(&event).await.unwrap();

        assert_eq!(first_id, second_id);

        let events = store.get_events_by_block_range(10, 10).await.unwrap();
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn distinct_log_index_same_tx_hash_both_persist() {
        let store = memory_store().await;
        store.insert_event(&sample_event(0)).await.unwrap();
        store.insert_event(&sample_event(1)).await.unwrap();

        let events = store.get_events_by_block_range(10, 10).await.unwrap();
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn upsert_balance_overwrites_existing_row() {
        let store = memory_store().await;
        let address = Address::parse("0x3333333333333333333333333333333333333333").unwrap();

        store
            .upsert_balance(&Balance {
                address: address.clone(),
                balance: RawAmount::parse("500").unwrap(),
                last_updated_block: 1,
                last_updated_timestamp: 100,
            })
            .await
            .unwrap();
        store
            .upsert_balance(&Balance {
                address: address.clone(),
                balance: RawAmount::parse("750").unwrap(),
                last_updated_block: 2,
                last_updated_timestamp: 200,
            })
            .await
            .unwrap();

        let balance = store.get_balance(address.as_str()).await.unwrap().unwrap();
        assert_eq!(balance.balance.to_string(), "750");
        assert_eq!(balance.last_updated_block, 2);
    }

    #[tokio::test]
    async fn metadata_round_trips() {
        let store = memory_store().await;
        assert_eq!(store.get_metadata("cumulative_split_multiplier_bps").await.unwrap(), None);

        store.set_metadata("cumulative_split_multiplier_bps", "10000").await.unwrap();
        store.set_metadata("cumulative_split_multiplier_bps", "20000").await.unwrap();

        assert_eq!(
            store.get_metadata("cumulative_split_multiplier_bps").await.unwrap(),
            Some("20000".to_string())
        );
    }

    #[tokio::test]
    async fn transaction_commits_all_writes_atomically() {
        let store = memory_store().await;
        let mut tx = store.begin().await.unwrap();
        tx.insert_event(&sample_event(0)).await.unwrap();
        tx.set_metadata("last_synced_block", "10").await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.get_events_by_block_range(10, 10).await.unwrap().len(), 1);
        assert_eq!(store.get_metadata("last_synced_block").await.unwrap(), Some("10".to_string()));
    }

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        let store = memory_store().await;
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_event(&sample_event(0)).await.unwrap();
            // tx dropped without commit
        }

        assert_eq!(store.get_events_by_block_range(10, 10).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn rollback_from_block_removes_reorged_events() {
        let store = memory_store().await;
        store.insert_event(&sample_event(0)).await.unwrap();

        let mut later = sample_event(0);
        later.block_number = 20;
        later.transaction_hash = "0xdef".into();
        store.insert_event(&later).await.unwrap();

        store.rollback_from_block(15).await.unwrap();

        assert_eq!(store.highest_indexed_block().await.unwrap(), Some(10));
    }
}
