pub mod chain;
pub mod codec;
pub mod constants;
pub mod error;
pub mod pow;

pub use chain::{Blockchain, ChainConfig, ChainIterator, ChainStore, MiningStrategy};
pub use error::{ChainError, Result};
pub use pow::ProofOfWork;

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Raw block hash bytes. Empty only as the genesis block's `prev_hash`.
pub type Hash = Vec<u8>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub timestamp: i64,
    pub data: Vec<u8>,
    pub prev_hash: Hash,
    pub hash: Hash,
    pub nonce: u64,
}

impl Block {
    /// Mines a block on top of `prev_hash` at the default difficulty, stamped with the current time.
    pub fn new(data: impl Into<Vec<u8>>, prev_hash: impl Into<Hash>) -> Self {
        ProofOfWork::default().mine(unix_now(), data.into(), prev_hash.into())
    }

    pub fn is_genesis(&self) -> bool {
        self.prev_hash.is_empty()
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(&self.hash)
    }

    pub fn prev_hash_hex(&self) -> String {
        hex::encode(&self.prev_hash)
    }
}

pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
