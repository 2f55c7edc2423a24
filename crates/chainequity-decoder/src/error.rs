#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed log for recognized topic: {0}")]
    Malformed(String),
}
