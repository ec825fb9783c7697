// This is the core chain implementation - an append-only, in-memory sequence
// of mined blocks behind a read/write lock. All writes (mining, retargeting)
// are serialized; readers see either the state before or after a write,
// never a half-applied one.

use crate::config::GLOBAL_CONFIG;
use crate::core::difficulty::{DifficultyAdjustment, DifficultyStats, TARGET_BLOCK_TIME};
use crate::core::mining::{self, MiningMetrics};
use crate::core::{Block, Transaction};
use crate::error::{BlockchainError, Result};
use crate::wallet::Wallet;
use data_encoding::HEXLOWER;
use log::info;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

// Everything the write lock protects: the block sequence plus the
// difficulty target for the next block.
struct ChainState {
    blocks: Vec<Block>,
    difficulty: u32,
}

/// The blockchain. Cloning is cheap and every clone shares the same
/// underlying chain state.
#[derive(Clone)]
pub struct Blockchain {
    state: Arc<RwLock<ChainState>>,
}

impl Blockchain {
    /// Create a new chain by synchronously mining a genesis block that
    /// awards the initial coinbase to `miner_address`.
    pub fn new(initial_difficulty: u32, miner_address: &str) -> Result<Blockchain> {
        info!("Creating genesis block for address: {miner_address}");
        let genesis = Block::new_genesis(initial_difficulty, miner_address)?;

        Ok(Blockchain {
            state: Arc::new(RwLock::new(ChainState {
                blocks: vec![genesis],
                difficulty: initial_difficulty,
            })),
        })
    }

    /// Create a new chain using the configured initial difficulty.
    pub fn new_from_config(miner_address: &str) -> Result<Blockchain> {
        Self::new(GLOBAL_CONFIG.get_initial_difficulty(), miner_address)
    }

    /// Mine a block containing `transactions` and append it to the chain.
    ///
    /// Every transaction is verified against the current chain and the set
    /// is checked for intra-block double spends before any mining work
    /// starts. On an adjustment boundary the difficulty target for the next
    /// block is retargeted. Any failure leaves the chain unchanged.
    pub fn mine_and_append(
        &self,
        transactions: Vec<Transaction>,
    ) -> Result<(Block, MiningMetrics)> {
        let mut state = self
            .state
            .write()
            .expect("Failed to acquire write lock on chain - this should never happen");

        for (i, tx) in transactions.iter().enumerate() {
            if !Self::verify_transaction_in(&state.blocks, tx) {
                return Err(BlockchainError::Transaction(format!(
                    "Invalid transaction at index {i}"
                )));
            }
        }
        Self::check_for_double_spending(&transactions)?;

        let tip = state
            .blocks
            .last()
            .expect("Chain always holds at least the genesis block");
        let mut block = Block::new(
            tip.get_index() + 1,
            transactions,
            tip.get_hash().to_string(),
            state.difficulty,
        )?;

        // The nonce search runs inside the write critical section, so
        // readers block for the duration of the mining run
        let metrics = mining::mine_block(&mut block)?;
        state.blocks.push(block.clone());

        if DifficultyAdjustment::should_adjust(state.blocks.len()) {
            let next = DifficultyAdjustment::calculate_next(
                &state.blocks,
                state.difficulty,
                TARGET_BLOCK_TIME,
            );
            state.difficulty = next;
        }

        Ok((block, metrics))
    }

    /// The most recent block.
    pub fn tip(&self) -> Option<Block> {
        self.read_state().blocks.last().cloned()
    }

    /// Number of blocks in the chain, genesis included.
    pub fn length(&self) -> usize {
        self.read_state().blocks.len()
    }

    /// Block at `index`, or `OutOfRange`.
    pub fn get(&self, index: usize) -> Result<Block> {
        let state = self.read_state();
        state
            .blocks
            .get(index)
            .cloned()
            .ok_or(BlockchainError::OutOfRange {
                index,
                length: state.blocks.len(),
            })
    }

    /// Difficulty target the next mined block will carry.
    pub fn current_difficulty(&self) -> u32 {
        self.read_state().difficulty
    }

    /// Snapshot of all blocks in order.
    pub fn blocks(&self) -> Vec<Block> {
        self.read_state().blocks.clone()
    }

    /// Whole-chain integrity check.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Like [`Blockchain::is_valid`], but reports why the chain is broken.
    pub fn validate(&self) -> Result<()> {
        let state = self.read_state();
        let blocks = &state.blocks;

        if blocks.is_empty() {
            return Err(BlockchainError::InvalidChain("Chain is empty".to_string()));
        }

        if blocks[0].get_index() != 0 {
            return Err(BlockchainError::InvalidChain(
                "Genesis block has non-zero index".to_string(),
            ));
        }
        if !blocks[0].get_previous_hash().is_empty() {
            return Err(BlockchainError::InvalidChain(
                "Genesis block has a previous hash".to_string(),
            ));
        }

        for (i, block) in blocks.iter().enumerate() {
            if !block.validate() {
                return Err(BlockchainError::InvalidChain(format!(
                    "Block {i} fails its integrity check"
                )));
            }

            if i > 0 {
                let prev_block = &blocks[i - 1];

                if block.get_index() != prev_block.get_index() + 1 {
                    return Err(BlockchainError::InvalidChain(format!(
                        "Block {i} breaks index continuity"
                    )));
                }
                if block.get_previous_hash() != prev_block.get_hash() {
                    return Err(BlockchainError::InvalidChain(format!(
                        "Block {i} does not link to its predecessor"
                    )));
                }
                if block.get_timestamp() < prev_block.get_timestamp() {
                    return Err(BlockchainError::InvalidChain(format!(
                        "Block {i} is older than its predecessor"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Find a transaction by ID with a linear scan over the chain.
    pub fn find_transaction(&self, id: &[u8]) -> Result<Transaction> {
        let state = self.read_state();
        Self::find_transaction_in(&state.blocks, id)
            .ok_or_else(|| BlockchainError::TransactionNotFound(HEXLOWER.encode(id)))
    }

    /// Sign `tx` with `wallet`, resolving each input's previous transaction
    /// from this chain.
    pub fn sign_transaction(&self, tx: &mut Transaction, wallet: &Wallet) -> Result<()> {
        if tx.is_coinbase() {
            return Ok(());
        }

        let prev_txs = self.resolve_prev_txs(tx)?;
        tx.sign(wallet, &prev_txs)
    }

    /// Verify `tx` against this chain. Coinbase transactions are always
    /// valid; anything referencing an unknown transaction is not.
    pub fn verify_transaction(&self, tx: &Transaction) -> bool {
        let state = self.read_state();
        Self::verify_transaction_in(&state.blocks, tx)
    }

    /// Every transaction in every block, in chain order (diagnostic).
    pub fn all_transactions(&self) -> Vec<Transaction> {
        self.read_state()
            .blocks
            .iter()
            .flat_map(|block| block.get_transactions().iter().cloned())
            .collect()
    }

    /// Retargeting snapshot over the live chain.
    pub fn difficulty_stats(&self) -> DifficultyStats {
        let state = self.read_state();
        DifficultyAdjustment::stats(&state.blocks, state.difficulty)
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, ChainState> {
        self.state
            .read()
            .expect("Failed to acquire read lock on chain - this should never happen")
    }

    fn resolve_prev_txs(&self, tx: &Transaction) -> Result<HashMap<String, Transaction>> {
        let mut prev_txs = HashMap::new();
        for input in tx.get_inputs() {
            let txid_hex = HEXLOWER.encode(input.get_prev_txid());
            let prev_tx = self
                .find_transaction(input.get_prev_txid())
                .map_err(|_| BlockchainError::MissingPrevTx(txid_hex.clone()))?;
            prev_txs.insert(txid_hex, prev_tx);
        }
        Ok(prev_txs)
    }

    fn find_transaction_in(blocks: &[Block], id: &[u8]) -> Option<Transaction> {
        for block in blocks {
            for tx in block.get_transactions() {
                if tx.get_id() == id {
                    return Some(tx.clone());
                }
            }
        }
        None
    }

    fn verify_transaction_in(blocks: &[Block], tx: &Transaction) -> bool {
        if tx.is_coinbase() {
            return true;
        }

        let mut prev_txs = HashMap::new();
        for input in tx.get_inputs() {
            match Self::find_transaction_in(blocks, input.get_prev_txid()) {
                Some(prev_tx) => {
                    prev_txs.insert(HEXLOWER.encode(input.get_prev_txid()), prev_tx);
                }
                None => return false,
            }
        }

        tx.verify(&prev_txs)
    }

    // Reject a block candidate where two transactions (or two inputs of one
    // transaction) spend the same output.
    fn check_for_double_spending(transactions: &[Transaction]) -> Result<()> {
        let mut spent_outputs: HashSet<(Vec<u8>, i64)> = HashSet::new();

        for (tx_index, tx) in transactions.iter().enumerate() {
            if tx.is_coinbase() {
                continue;
            }

            for input in tx.get_inputs() {
                let output_reference = (input.get_prev_txid().to_vec(), input.get_out_index());
                if !spent_outputs.insert(output_reference) {
                    return Err(BlockchainError::Transaction(format!(
                        "Double spend in transaction {tx_index}: output {}:{} already spent in this block",
                        HEXLOWER.encode(input.get_prev_txid()),
                        input.get_out_index()
                    )));
                }
            }
        }

        Ok(())
    }

    /// Mutate a stored block in place (for tamper tests only)
    #[cfg(test)]
    pub(crate) fn tamper_block<F: FnOnce(&mut Block)>(&self, index: usize, f: F) {
        let mut state = self
            .state
            .write()
            .expect("Failed to acquire write lock on chain - this should never happen");
        f(&mut state.blocks[index]);
    }
}
