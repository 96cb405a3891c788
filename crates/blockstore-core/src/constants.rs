pub const DEFAULT_DIFFICULTY_BITS: u32 = 24;
pub const MAX_NONCE: u64 = i64::MAX as u64;
pub const BLOCKS_TREE: &str = "blocks";
pub const TIP_KEY: &[u8] = b"l";
pub const DEFAULT_DB_PATH: &str = "blockstore.db";
pub const GENESIS_DATA: &[u8] = b"Genesis Block";
