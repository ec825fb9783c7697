use crate::core::mining;
use crate::core::transaction::Transaction;
use crate::error::{BlockchainError, Result};
use crate::utils::{current_timestamp, merkle_root, sha256_digest};
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Block {
    index: u64,
    timestamp: i64,
    transactions: Vec<Transaction>,
    previous_hash: String,
    hash: String,
    nonce: i64,
    difficulty: u32, // Required count of leading '0' hex digits in the hash
}

// Hash preimage with a fixed field order; the canonical encoding of this
// struct is what the proof-of-work search and all validation recompute.
#[derive(bincode::Encode)]
struct HeaderPreimage {
    index: u64,
    timestamp: i64,
    tx_ids: Vec<Vec<u8>>,
    previous_hash: String,
    nonce: i64,
    difficulty: u32,
}

impl Block {
    /// Create an unmined block. The hash stays empty until mining assigns it.
    pub fn new(
        index: u64,
        transactions: Vec<Transaction>,
        previous_hash: String,
        difficulty: u32,
    ) -> Result<Block> {
        Ok(Block {
            index,
            timestamp: current_timestamp()?,
            transactions,
            previous_hash,
            hash: String::new(),
            nonce: 0,
            difficulty,
        })
    }

    /// Create and mine the genesis block, paying the initial coinbase
    /// reward to `miner_address`.
    pub fn new_genesis(difficulty: u32, miner_address: &str) -> Result<Block> {
        let coinbase_tx = Transaction::new_coinbase(miner_address, "Genesis Block")?;
        let mut block = Block::new(0, vec![coinbase_tx], String::new(), difficulty)?;
        mining::mine_block(&mut block)?;
        Ok(block)
    }

    /// Canonical serialization of the header fields that feed the hash.
    /// Transactions participate through their IDs only.
    pub fn hash_preimage(&self) -> Result<Vec<u8>> {
        self.preimage_with_nonce(self.nonce)
    }

    /// Hash of this block at its stored nonce.
    pub fn compute_hash(&self) -> Result<String> {
        self.compute_hash_with_nonce(self.nonce)
    }

    /// Hash of this block at an arbitrary nonce, for the mining search.
    pub fn compute_hash_with_nonce(&self, nonce: i64) -> Result<String> {
        let preimage = self.preimage_with_nonce(nonce)?;
        Ok(HEXLOWER.encode(sha256_digest(preimage.as_slice()).as_slice()))
    }

    /// Self-integrity check: the stored hash must be recomputable and must
    /// satisfy this block's difficulty target.
    pub fn validate(&self) -> bool {
        match self.compute_hash() {
            Ok(computed) => {
                computed == self.hash && mining::check_difficulty(&self.hash, self.difficulty)
            }
            Err(_) => false,
        }
    }

    /// Merkle root over the transaction IDs. Reserved for inclusion proofs;
    /// deliberately not part of the hash preimage.
    pub fn merkle_root_of_txs(&self) -> Vec<u8> {
        let tx_ids = self
            .transactions
            .iter()
            .map(|tx| tx.get_id().to_vec())
            .collect::<Vec<_>>();
        merkle_root(&tx_ids)
    }

    pub fn get_index(&self) -> u64 {
        self.index
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_previous_hash(&self) -> &str {
        self.previous_hash.as_str()
    }

    pub fn get_hash(&self) -> &str {
        self.hash.as_str()
    }

    pub fn get_nonce(&self) -> i64 {
        self.nonce
    }

    pub fn get_difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Record the winning nonce and its hash. Only the miner calls this.
    pub(crate) fn seal(&mut self, nonce: i64, hash: String) {
        self.nonce = nonce;
        self.hash = hash;
    }

    fn preimage_with_nonce(&self, nonce: i64) -> Result<Vec<u8>> {
        let preimage = HeaderPreimage {
            index: self.index,
            timestamp: self.timestamp,
            tx_ids: self
                .transactions
                .iter()
                .map(|tx| tx.get_id().to_vec())
                .collect(),
            previous_hash: self.previous_hash.clone(),
            nonce,
            difficulty: self.difficulty,
        };

        // Same canonical encoding the transaction IDs use; the block hash
        // is only recomputable as long as this stays byte-stable
        bincode::encode_to_vec(&preimage, bincode::config::standard()).map_err(|e| {
            BlockchainError::Serialization(format!("Failed to encode block header: {e}"))
        })
    }

    /// Create a block with a fixed timestamp (for testing only)
    #[cfg(test)]
    pub(crate) fn new_test_block(
        timestamp: i64,
        transactions: Vec<Transaction>,
        previous_hash: String,
        index: u64,
        difficulty: u32,
    ) -> Block {
        Block {
            index,
            timestamp,
            transactions,
            previous_hash,
            hash: String::new(),
            nonce: 0,
            difficulty,
        }
    }

    #[cfg(test)]
    pub(crate) fn set_previous_hash(&mut self, previous_hash: String) {
        self.previous_hash = previous_hash;
    }

    #[cfg(test)]
    pub(crate) fn set_timestamp(&mut self, timestamp: i64) {
        self.timestamp = timestamp;
    }
}
