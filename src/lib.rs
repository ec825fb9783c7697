//! # Minichain - An In-Memory Educational Blockchain
//!
//! This is a complete single-process blockchain engine built for learning.
//! When I come back to this code, here's what I need to remember:
//!
//! ## What I Built
//! - **Content-addressed chain**: SHA-256 linked blocks with self-integrity checks
//! - **Proof-of-Work**: nonce search against a leading-zeros target with
//!   windowed, bounded difficulty retargeting
//! - **UTXO Model**: coinbase and transfer transactions with ECDSA P-256
//!   signatures over a trimmed transaction image
//! - **UTXO Index**: address balances and spendable-output selection derived
//!   from the chain, advanced per block or rebuilt from scratch
//! - **Wallet System**: P-256 key management with double-SHA-256 hex addresses
//!
//! ## How I Organized My Code
//! - `core/`: the heart of the chain (blocks, transactions, mining, consensus)
//! - `storage/`: the UTXO index
//! - `wallet/`: key management, address generation, signing
//! - `config/`: runtime configuration from the environment
//! - `utils/`: cryptographic functions and the canonical serialization
//! - `error/`: one error enum shared by everything
//!
//! ## Key Design Decisions I Made
//! - Everything lives in memory; persistence and networking belong to callers
//! - Chain and UTXO set are shared via internal read/write locks, so clones
//!   are cheap handles onto the same state
//! - Transaction IDs and block hashes are computed over one canonical
//!   bincode encoding, applied right where each preimage is built
//! - Mining runs inside the chain's write critical section; a failed mine
//!   leaves the chain untouched
//!
//! Remember: this is educational but written to production discipline -
//! every component has tests and structured errors.

pub mod config;
pub mod core;
pub mod error;
pub mod storage;
pub mod utils;
pub mod wallet;

// Re-export commonly used types for convenience
pub use crate::config::{Config, GLOBAL_CONFIG};
pub use crate::core::{
    check_difficulty, mine_block, mine_block_with_budget, validate_pow, Block, Blockchain,
    DifficultyAdjustment, DifficultyStats, MiningMetrics, Transaction, TxInput, TxOutput,
    ADJUSTMENT_INTERVAL, COINBASE_INPUT_INDEX, COINBASE_REWARD, MAX_ADJUSTMENT_FACTOR,
    MAX_DIFFICULTY, MIN_DIFFICULTY, TARGET_BLOCK_TIME,
};
pub use crate::error::{BlockchainError, Result};
pub use crate::storage::{UTXOSet, Utxo};
pub use crate::utils::{
    current_timestamp, ecdsa_p256_sign, ecdsa_p256_verify, hash_pub_key, merkle_root,
    pub_key_to_address, sha256_digest, sha256_hex,
};
pub use crate::wallet::{KeyMaterial, Wallet, Wallets};
