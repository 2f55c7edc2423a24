/// DDL applied on startup. SQLite has no native migration runner in this
/// tree — tables are created idempotently, matching the way the
/// flare-emissary poller bootstraps its indexer-state tables at connect time.
pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS events (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    block_number     INTEGER NOT NULL,
    transaction_hash TEXT    NOT NULL,
    log_index        INTEGER NOT NULL,
    event_type       TEXT    NOT NULL,
    from_address     TEXT,
    to_address       TEXT,
    amount           TEXT,
    data             TEXT    NOT NULL,
    gas_used         TEXT,
    gas_price        TEXT,
    timestamp        INTEGER NOT NULL,
    UNIQUE (transaction_hash, log_index)
);

CREATE INDEX IF NOT EXISTS idx_events_block_number ON events (block_number);
CREATE INDEX IF NOT EXISTS idx_events_type ON events (event_type);
CREATE INDEX IF NOT EXISTS idx_events_from_address ON events (from_address);
CREATE INDEX IF NOT EXISTS idx_events_to_address ON events (to_address);

CREATE TABLE IF NOT EXISTS balances (
    address                 TEXT PRIMARY KEY,
    balance                 TEXT NOT NULL,
    last_updated_block      INTEGER NOT NULL,
    last_updated_timestamp  INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS corporate_actions (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    action_type      TEXT NOT NULL,
    block_number     INTEGER NOT NULL,
    transaction_hash TEXT NOT NULL,
    old_value        TEXT NOT NULL,
    new_value        TEXT NOT NULL,
    timestamp        INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS metadata (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;
