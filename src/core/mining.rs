use crate::core::difficulty::MAX_DIFFICULTY;
use crate::core::Block;
use crate::error::{BlockchainError, Result};
use log::{debug, info};
use std::time::{Duration, Instant};

/// Performance report of a completed mining run.
#[derive(Debug, Clone)]
pub struct MiningMetrics {
    pub attempts: u64,
    pub duration: Duration,
    pub hash_rate: f64, // hashes per second
    pub nonce: i64,
    pub hash: String,
    pub difficulty: u32,
}

/// A hash satisfies difficulty `d` iff it starts with `d` '0' hex digits.
pub fn check_difficulty(hash: &str, difficulty: u32) -> bool {
    if difficulty == 0 {
        return true;
    }
    let prefix_len = difficulty as usize;
    hash.len() >= prefix_len && hash.as_bytes()[..prefix_len].iter().all(|b| *b == b'0')
}

/// Search for a nonce satisfying the block's difficulty target, starting
/// from zero. The block is only mutated once a winning nonce is found.
pub fn mine_block(block: &mut Block) -> Result<MiningMetrics> {
    mine_block_with_budget(block, None)
}

/// Like [`mine_block`], but gives up with `Cancelled` after `attempt_budget`
/// hash attempts, leaving the block untouched.
pub fn mine_block_with_budget(
    block: &mut Block,
    attempt_budget: Option<u64>,
) -> Result<MiningMetrics> {
    let difficulty = block.get_difficulty();
    if difficulty > MAX_DIFFICULTY {
        return Err(BlockchainError::InvalidDifficulty(difficulty));
    }

    debug!(
        "Starting proof-of-work for block at height {} with difficulty {difficulty}",
        block.get_index()
    );

    let start = Instant::now();
    let mut attempts: u64 = 0;
    let mut nonce: i64 = 0;

    loop {
        let hash = block.compute_hash_with_nonce(nonce)?;
        attempts += 1;

        if check_difficulty(&hash, difficulty) {
            block.seal(nonce, hash.clone());
            let duration = start.elapsed();
            let seconds = duration.as_secs_f64();
            let hash_rate = if seconds > 0.0 {
                attempts as f64 / seconds
            } else {
                0.0
            };

            info!("Proof-of-work completed after {attempts} attempts: {hash}");
            return Ok(MiningMetrics {
                attempts,
                duration,
                hash_rate,
                nonce,
                hash,
                difficulty,
            });
        }

        if let Some(budget) = attempt_budget {
            if attempts >= budget {
                return Err(BlockchainError::Cancelled);
            }
        }

        // The nonce space is effectively inexhaustible, but wrapping around
        // silently would re-test old nonces forever
        nonce = nonce.checked_add(1).ok_or_else(|| {
            BlockchainError::Mining("Nonce overflow - unable to find valid hash".to_string())
        })?;
    }
}

/// Recompute the block's hash and re-check the difficulty prefix.
pub fn validate_pow(block: &Block) -> bool {
    match block.compute_hash() {
        Ok(computed) => {
            computed == block.get_hash() && check_difficulty(&computed, block.get_difficulty())
        }
        Err(_) => false,
    }
}
