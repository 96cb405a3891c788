use anyhow::Result;
use blockstore_core::constants::{DEFAULT_DB_PATH, DEFAULT_DIFFICULTY_BITS};
use blockstore_core::{Block, Blockchain, ChainConfig, ChainStore, MiningStrategy, ProofOfWork};
use blockstore_storage::SledStore;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "blockstore")]
#[command(about = "Append to and inspect a persisted proof-of-work block chain")]
struct Cli {
    /// Directory of the sled database
    #[arg(long, default_value = DEFAULT_DB_PATH, global = true)]
    db_path: String,

    /// Difficulty bits; must match the value the chain was mined with
    #[arg(long, default_value_t = DEFAULT_DIFFICULTY_BITS, global = true)]
    difficulty: u32,

    /// Spread the nonce search over all cores
    #[arg(long, global = true)]
    parallel: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mine a block carrying DATA and append it
    Add {
        data: String,
    },
    /// Print every block from tip to genesis
    Print {
        /// One JSON object per line instead of text
        #[arg(long)]
        json: bool,
    },
    /// Check linkage and proof of work for the whole chain
    Verify,
    /// Append "First Block", "Second Block", "Third Block" and print the chain
    Demo,
}

#[derive(Serialize)]
struct BlockView {
    timestamp: i64,
    prev_hash: String,
    data: String,
    hash: String,
    nonce: u64,
    pow: bool,
}

impl BlockView {
    fn new(block: &Block, pow: bool) -> Self {
        Self {
            timestamp: block.timestamp,
            prev_hash: block.prev_hash_hex(),
            data: String::from_utf8_lossy(&block.data).into_owned(),
            hash: block.hash_hex(),
            nonce: block.nonce,
            pow,
        }
    }
}

fn print_chain<S: ChainStore>(chain: &Blockchain<S>, json: bool) -> Result<()> {
    for block in chain.iter() {
        let block = block?;
        let view = BlockView::new(&block, chain.validate(&block));
        if json {
            println!("{}", serde_json::to_string(&view)?);
        } else {
            println!("Previous Hash: {}", view.prev_hash);
            println!("Data: {}", view.data);
            println!("Hash: {}", view.hash);
            println!("PoW: {}", view.pow);
            println!();
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    // Reject a bad difficulty before sled creates the database directory.
    let pow = ProofOfWork::new(cli.difficulty)?;
    let config = ChainConfig {
        difficulty_bits: pow.difficulty_bits(),
        strategy: if cli.parallel {
            MiningStrategy::Parallel
        } else {
            MiningStrategy::Sequential
        },
    };
    let store = Arc::new(SledStore::open(&cli.db_path)?);
    let mut chain = Blockchain::open(store, config)?;

    match cli.cmd {
        Command::Add { data } => {
            let block = chain.add_block(data)?;
            println!("{}", block.hash_hex());
        }
        Command::Print { json } => print_chain(&chain, json)?,
        Command::Verify => {
            let count = chain.verify()?;
            println!("chain ok: {count} blocks");
        }
        Command::Demo => {
            for data in ["First Block", "Second Block", "Third Block"] {
                chain.add_block(data)?;
            }
            info!("demo blocks appended");
            print_chain(&chain, false)?;
        }
    }
    Ok(())
}
