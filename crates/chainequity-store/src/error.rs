#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database connection failed: {0}")]
    Connection(String),
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),
    #[error("record not found")]
    NotFound,
    #[error("invalid stored value: {0}")]
    Corrupt(String),
}
