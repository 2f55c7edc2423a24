#[derive(Debug, thiserror::Error)]
pub enum ChainClientError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("rpc call failed: {0}")]
    Rpc(String),
    #[error("receipt not available after retries for tx {0}")]
    ReceiptUnavailable(String),
    #[error("subscription closed")]
    SubscriptionClosed,
    #[error("invalid response from node: {0}")]
    InvalidResponse(String),
}
