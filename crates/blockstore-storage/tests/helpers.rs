#![allow(dead_code)]

use blockstore_core::{Block, ChainConfig, Hash, ProofOfWork};
use blockstore_storage::SledStore;
use std::fs;
use tempfile::{tempdir, TempDir};

/// Low enough to keep debug-build test runs fast.
pub const TEST_DIFFICULTY: u32 = 8;

pub fn test_config() -> ChainConfig {
    ChainConfig::with_difficulty(TEST_DIFFICULTY)
}

pub fn create_temp_store() -> (TempDir, SledStore) {
    // Create a temporary directory for the sled database
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("blockstore.db");
    let store = SledStore::open(&db_path).expect("Failed to open SledStore");
    (temp_dir, store)
}

pub fn db_path(temp_dir: &TempDir) -> std::path::PathBuf {
    temp_dir.path().join("blockstore.db")
}

pub fn mined(data: &str, prev_hash: Hash, timestamp: i64) -> Block {
    ProofOfWork::new(TEST_DIFFICULTY)
        .expect("valid difficulty")
        .mine(timestamp, data.as_bytes().to_vec(), prev_hash)
}

pub fn remove_temp_dir(temp_dir: TempDir) {
    let db_path = temp_dir.path().to_path_buf();
    temp_dir.close().expect("Failed to delete temp dir");
    let _ = fs::remove_dir_all(&db_path);
    // Verify the directory is removed
    assert!(!db_path.exists(), "Database directory should be removed");
}
