#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("invalid raw amount: {0}")]
    InvalidAmount(String),
}
