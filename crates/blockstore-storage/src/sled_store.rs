use blockstore_core::codec;
use blockstore_core::constants::{BLOCKS_TREE, TIP_KEY};
use blockstore_core::{Block, ChainError, ChainStore, Hash, Result};
use sled::transaction::{ConflictableTransactionResult, TransactionError};
use sled::{Db, Tree};
use std::path::Path;
use tracing::{debug, info};

#[derive(Clone)]
pub struct SledStore {
  db: Db,
}

impl SledStore {
  pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
    let db = sled::open(path.as_ref()).map_err(ChainError::storage)?;
    info!(path = %path.as_ref().display(), "sled store opened");
    Ok(Self { db })
  }

  pub fn has_namespace(&self) -> bool {
    self
      .db
      .tree_names()
      .iter()
      .any(|name| &name[..] == BLOCKS_TREE.as_bytes())
  }

  /// Opens the blocks tree without creating it.
  fn blocks(&self) -> Result<Tree> {
    if !self.has_namespace() {
      return Err(ChainError::NamespaceMissing(BLOCKS_TREE.to_string()));
    }
    self.db.open_tree(BLOCKS_TREE).map_err(ChainError::storage)
  }

  pub fn flush(&self) -> Result<()> {
    self.db.flush().map_err(ChainError::storage)?;
    Ok(())
  }
}

fn tx_error(err: TransactionError<()>) -> ChainError {
  match err {
    TransactionError::Storage(e) => ChainError::storage(e),
    TransactionError::Abort(()) => ChainError::storage("transaction aborted"),
  }
}

impl ChainStore for SledStore {
  fn tip(&self) -> Result<Option<Hash>> {
    if !self.has_namespace() {
      return Ok(None);
    }
    let tip = self.blocks()?.get(TIP_KEY).map_err(ChainError::storage)?;
    Ok(tip.map(|v| v.to_vec()))
  }

  fn initialize(&self, genesis: &Block) -> Result<Hash> {
    let tree = self.db.open_tree(BLOCKS_TREE).map_err(ChainError::storage)?;
    let encoded = codec::serialize(genesis)?;
    let tip = tree
      .transaction(|tx| -> ConflictableTransactionResult<Hash> {
        if let Some(existing) = tx.get(TIP_KEY)? {
          return Ok(existing.to_vec());
        }
        tx.insert(genesis.hash.as_slice(), encoded.as_slice())?;
        tx.insert(TIP_KEY, genesis.hash.as_slice())?;
        Ok(genesis.hash.clone())
      })
      .map_err(tx_error)?;
    self.flush()?;
    Ok(tip)
  }

  fn append(&self, block: &Block) -> Result<()> {
    let tree = self.blocks()?;
    let encoded = codec::serialize(block)?;
    tree
      .transaction(|tx| -> ConflictableTransactionResult<()> {
        tx.insert(block.hash.as_slice(), encoded.as_slice())?;
        tx.insert(TIP_KEY, block.hash.as_slice())?;
        Ok(())
      })
      .map_err(tx_error)?;
    self.flush()?;
    debug!(hash = %block.hash_hex(), bytes = encoded.len(), "block record written");
    Ok(())
  }

  fn get_block(&self, hash: &[u8]) -> Result<Option<Block>> {
    let tree = self.blocks()?;
    // The tip pointer shares the tree but is never a block record.
    if hash == TIP_KEY {
      return Ok(None);
    }
    match tree.get(hash).map_err(ChainError::storage)? {
      Some(bytes) => Ok(Some(codec::deserialize(&bytes)?)),
      None => Ok(None),
    }
  }
}
