//! Storage encoding for blocks. Stored chains depend on this layout staying fixed.

use crate::error::{ChainError, Result};
use crate::Block;

pub fn serialize(block: &Block) -> Result<Vec<u8>> {
    bincode::serialize(block).map_err(ChainError::Encode)
}

pub fn deserialize(bytes: &[u8]) -> Result<Block> {
    bincode::deserialize(bytes).map_err(ChainError::Decode)
}
