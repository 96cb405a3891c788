use blockstore_core::codec;
use blockstore_core::constants::{BLOCKS_TREE, TIP_KEY};
use blockstore_core::{Block, ChainError, ChainStore, Hash, Result};
use std::collections::BTreeMap;
use std::sync::RwLock;

type Records = BTreeMap<Vec<u8>, Vec<u8>>;

/// In-process stand-in for the embedded engine. `None` means the namespace
/// has not been created. Writers hold the write lock for the whole
/// transaction and changes are swapped in only when the closure succeeds.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Option<Records>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_read_tx<T>(&self, f: impl FnOnce(Option<&Records>) -> Result<T>) -> Result<T> {
        let guard = self
            .records
            .read()
            .map_err(|_| ChainError::storage("memory store lock poisoned"))?;
        f(guard.as_ref())
    }

    pub fn with_write_tx<T>(&self, f: impl FnOnce(&mut Option<Records>) -> Result<T>) -> Result<T> {
        let mut guard = self
            .records
            .write()
            .map_err(|_| ChainError::storage("memory store lock poisoned"))?;
        let mut staged = guard.clone();
        let out = f(&mut staged)?;
        *guard = staged;
        Ok(out)
    }

    /// Overwrites a raw record, bypassing the codec. Fails if the namespace is missing.
    pub fn put_raw(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.with_write_tx(|records| {
            namespace_mut(records)?.insert(key.to_vec(), value.to_vec());
            Ok(())
        })
    }

    pub fn len(&self) -> Result<usize> {
        self.with_read_tx(|records| Ok(records.map_or(0, |r| r.len())))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

fn namespace_mut(records: &mut Option<Records>) -> Result<&mut Records> {
    records
        .as_mut()
        .ok_or_else(|| ChainError::NamespaceMissing(BLOCKS_TREE.to_string()))
}

impl ChainStore for MemoryStore {
    fn tip(&self) -> Result<Option<Hash>> {
        self.with_read_tx(|records| Ok(records.and_then(|r| r.get(TIP_KEY).cloned())))
    }

    fn initialize(&self, genesis: &Block) -> Result<Hash> {
        let encoded = codec::serialize(genesis)?;
        self.with_write_tx(|records| {
            let records = records.get_or_insert_with(Records::new);
            if let Some(existing) = records.get(TIP_KEY) {
                return Ok(existing.clone());
            }
            records.insert(genesis.hash.clone(), encoded);
            records.insert(TIP_KEY.to_vec(), genesis.hash.clone());
            Ok(genesis.hash.clone())
        })
    }

    fn append(&self, block: &Block) -> Result<()> {
        let encoded = codec::serialize(block)?;
        self.with_write_tx(|records| {
            let records = namespace_mut(records)?;
            records.insert(block.hash.clone(), encoded);
            records.insert(TIP_KEY.to_vec(), block.hash.clone());
            Ok(())
        })
    }

    fn get_block(&self, hash: &[u8]) -> Result<Option<Block>> {
        self.with_read_tx(|records| {
            let records = records.ok_or_else(|| ChainError::NamespaceMissing(BLOCKS_TREE.to_string()))?;
            if hash == TIP_KEY {
                return Ok(None);
            }
            records.get(hash).map(|bytes| codec::deserialize(bytes)).transpose()
        })
    }
}
