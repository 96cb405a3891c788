use crate::constants::{BLOCKS_TREE, DEFAULT_DIFFICULTY_BITS, GENESIS_DATA};
use crate::error::{ChainError, Result};
use crate::pow::ProofOfWork;
use crate::{unix_now, Block, Hash};
use std::sync::Arc;
use tracing::{debug, info};

pub use crate::pow::MiningStrategy;

/// Persistence the chain needs from a key-value engine. Implementations map each
/// method onto one read or one read-write transaction of the engine.
pub trait ChainStore: Send + Sync {
    /// Tip pointer, or `None` while the blocks namespace is uninitialized.
    fn tip(&self) -> Result<Option<Hash>>;

    /// Creates the namespace and writes `genesis` plus the tip pointer in one
    /// transaction. If a tip already exists nothing is written and it is returned.
    fn initialize(&self, genesis: &Block) -> Result<Hash>;

    /// Writes the block keyed by its hash and moves the tip to it, atomically.
    fn append(&self, block: &Block) -> Result<()>;

    /// `Ok(None)` when no record exists under `hash`.
    fn get_block(&self, hash: &[u8]) -> Result<Option<Block>>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainConfig {
    pub difficulty_bits: u32,
    pub strategy: MiningStrategy,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            difficulty_bits: DEFAULT_DIFFICULTY_BITS,
            strategy: MiningStrategy::Sequential,
        }
    }
}

impl ChainConfig {
    pub fn with_difficulty(difficulty_bits: u32) -> Self {
        Self {
            difficulty_bits,
            ..Self::default()
        }
    }
}

/// Owns the store handle and the cached tip of one persisted chain.
pub struct Blockchain<S: ChainStore> {
    store: Arc<S>,
    tip: Hash,
    pow: ProofOfWork,
    strategy: MiningStrategy,
}

impl<S: ChainStore> Blockchain<S> {
    /// Attaches to the chain in `store`, mining and writing the genesis block
    /// first if the store has never been initialized.
    pub fn open(store: Arc<S>, config: ChainConfig) -> Result<Self> {
        let pow = ProofOfWork::new(config.difficulty_bits)?;
        let tip = match store.tip()? {
            Some(tip) => {
                info!(tip = %hex::encode(&tip), "attached to existing chain");
                tip
            }
            None => {
                let genesis = pow.mine_with(config.strategy, unix_now(), GENESIS_DATA.to_vec(), Hash::new());
                let tip = store.initialize(&genesis)?;
                info!(tip = %hex::encode(&tip), "initialized chain with genesis block");
                tip
            }
        };
        Ok(Self {
            store,
            tip,
            pow,
            strategy: config.strategy,
        })
    }

    pub fn tip(&self) -> &[u8] {
        &self.tip
    }

    pub fn proof_of_work(&self) -> &ProofOfWork {
        &self.pow
    }

    /// Mines `data` on top of the stored tip and appends it.
    pub fn add_block(&mut self, data: impl Into<Vec<u8>>) -> Result<Block> {
        let last_hash = self
            .store
            .tip()?
            .ok_or_else(|| ChainError::NamespaceMissing(BLOCKS_TREE.to_string()))?;
        let block = self
            .pow
            .mine_with(self.strategy, unix_now(), data.into(), last_hash);
        self.store.append(&block)?;
        self.tip = block.hash.clone();
        info!(hash = %block.hash_hex(), "appended block");
        Ok(block)
    }

    pub fn get_block(&self, hash: &[u8]) -> Result<Option<Block>> {
        self.store.get_block(hash)
    }

    pub fn validate(&self, block: &Block) -> bool {
        self.pow.validate(block)
    }

    pub fn iter(&self) -> ChainIterator<S> {
        ChainIterator {
            store: Arc::clone(&self.store),
            current: Some(self.tip.clone()),
        }
    }

    /// Walks tip to genesis checking linkage and proof of every block.
    /// Returns the number of blocks on success.
    pub fn verify(&self) -> Result<usize> {
        let mut count = 0usize;
        let mut expected = Some(self.tip.clone());
        for block in self.iter() {
            let block = block?;
            if let Some(expected) = expected.take() {
                if block.hash != expected {
                    return Err(ChainError::BrokenLink {
                        hash: block.hash_hex(),
                        expected: hex::encode(expected),
                    });
                }
            }
            if !self.pow.validate(&block) {
                return Err(ChainError::InvalidProof(block.hash_hex()));
            }
            debug!(hash = %block.hash_hex(), "verified block");
            expected = Some(block.prev_hash.clone());
            count += 1;
        }
        Ok(count)
    }
}

/// Backward cursor from a tip to the genesis block. Ends after yielding the
/// block with an empty `prev_hash`.
pub struct ChainIterator<S: ChainStore> {
    store: Arc<S>,
    current: Option<Hash>,
}

impl<S: ChainStore> ChainIterator<S> {
    pub fn new(store: Arc<S>, from: Hash) -> Self {
        Self {
            store,
            current: Some(from),
        }
    }
}

impl<S: ChainStore> Iterator for ChainIterator<S> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        let hash = self.current.take()?;
        let block = match self.store.get_block(&hash) {
            Ok(Some(block)) => block,
            Ok(None) => return Some(Err(ChainError::not_found(&hash))),
            Err(e) => return Some(Err(e)),
        };
        if !block.is_genesis() {
            self.current = Some(block.prev_hash.clone());
        }
        Some(Ok(block))
    }
}
