use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("storage unavailable: {0}")]
    Storage(#[source] BoxError),

    #[error("blocks namespace `{0}` does not exist")]
    NamespaceMissing(String),

    #[error("failed to encode block: {0}")]
    Encode(#[source] bincode::Error),

    #[error("failed to decode block record: {0}")]
    Decode(#[source] bincode::Error),

    #[error("block {0} not found")]
    NotFound(String),

    #[error("difficulty must be within 1..=255 bits, got {0}")]
    InvalidDifficulty(u32),

    #[error("block {hash} does not link to its successor's prev_hash {expected}")]
    BrokenLink { hash: String, expected: String },

    #[error("block {0} fails proof-of-work validation")]
    InvalidProof(String),
}

impl ChainError {
    /// Wraps any engine-level failure (open, read, write, commit).
    pub fn storage(err: impl Into<BoxError>) -> Self {
        ChainError::Storage(err.into())
    }

    pub fn not_found(hash: &[u8]) -> Self {
        ChainError::NotFound(hex::encode(hash))
    }
}

pub type Result<T> = std::result::Result<T, ChainError>;
