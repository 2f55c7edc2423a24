#[derive(Debug, thiserror::Error)]
pub enum CapTableError {
    #[error("store error: {0}")]
    Store(#[from] chainequity_store::StoreError),
    #[error("invalid block: {0} is ahead of the highest indexed block {1}")]
    BlockNotYetIndexed(u64, u64),
}
