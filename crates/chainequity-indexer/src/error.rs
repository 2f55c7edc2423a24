#[derive(Debug, thiserror::Error)]
pub enum IndexerError {
    #[error("chain client error: {0}")]
    Chain(#[from] chainequity_chain::ChainClientError),
    #[error("decode error: {0}")]
    Decode(#[from] chainequity_decoder::DecodeError),
    #[error("store error: {0}")]
    Store(#[from] chainequity_store::StoreError),
    #[error("exceeded {0} reconnect attempts")]
    ReconnectExhausted(u32),
    #[error("refusing to index non-localhost endpoint without explicit opt-in: {0}")]
    NonLocalhostEndpoint(String),
}
