use crate::core::Block;
use log::info;

/// Target seconds between consecutive blocks.
pub const TARGET_BLOCK_TIME: i64 = 10;

/// Number of blocks between difficulty adjustments.
pub const ADJUSTMENT_INTERVAL: usize = 10;

/// Largest allowed ratio between actual and target block time per adjustment.
pub const MAX_ADJUSTMENT_FACTOR: f64 = 2.0;

pub const MIN_DIFFICULTY: u32 = 0;
pub const MAX_DIFFICULTY: u32 = 10;

/// Snapshot of the retargeting state, for dashboards and diagnostics.
#[derive(Debug, Clone)]
pub struct DifficultyStats {
    pub current_difficulty: u32,
    pub average_block_time: f64,
    pub target_block_time: i64,
    pub blocks_until_adjustment: usize,
}

/// Windowed block-time measurement and bounded difficulty retargeting.
pub struct DifficultyAdjustment;

impl DifficultyAdjustment {
    /// Average seconds between consecutive blocks over the most recent
    /// `last_n` block pairs. Zero when fewer than two blocks exist.
    pub fn average_block_time(blocks: &[Block], last_n: usize) -> f64 {
        if blocks.len() <= 1 {
            return 0.0;
        }

        let pairs = last_n.min(blocks.len() - 1);
        if pairs == 0 {
            return 0.0;
        }

        let mut total_time: i64 = 0;
        for i in blocks.len() - pairs..blocks.len() {
            total_time += blocks[i].get_timestamp() - blocks[i - 1].get_timestamp();
        }

        total_time as f64 / pairs as f64
    }

    /// Retargeting happens every `ADJUSTMENT_INTERVAL` blocks.
    pub fn should_adjust(chain_length: usize) -> bool {
        chain_length >= ADJUSTMENT_INTERVAL && chain_length % ADJUSTMENT_INTERVAL == 0
    }

    /// Derive a new difficulty from the actual vs target block time.
    ///
    /// The ratio is clamped to `[1/MAX_ADJUSTMENT_FACTOR, MAX_ADJUSTMENT_FACTOR]`
    /// and converted to a whole-step adjustment via ceil(log2). Slow blocks
    /// lower the difficulty, fast blocks raise it, and the result stays
    /// within `[MIN_DIFFICULTY, MAX_DIFFICULTY]`.
    pub fn adjust(current_difficulty: u32, actual_time: f64, target_time: f64) -> u32 {
        if actual_time == 0.0 || target_time == 0.0 {
            return current_difficulty;
        }

        let ratio = (actual_time / target_time)
            .clamp(1.0 / MAX_ADJUSTMENT_FACTOR, MAX_ADJUSTMENT_FACTOR);

        let new_difficulty = if ratio > 1.0 {
            // Blocks are too slow, make mining easier
            current_difficulty as i64 - ratio.log2().ceil() as i64
        } else {
            // Blocks are too fast, make mining harder
            current_difficulty as i64 + (1.0 / ratio).log2().ceil() as i64
        };

        new_difficulty.clamp(MIN_DIFFICULTY as i64, MAX_DIFFICULTY as i64) as u32
    }

    /// Next difficulty for the given chain: retargets only on adjustment
    /// boundaries, otherwise keeps the current value.
    pub fn calculate_next(blocks: &[Block], current_difficulty: u32, target_time: i64) -> u32 {
        if !Self::should_adjust(blocks.len()) {
            return current_difficulty;
        }

        let average = Self::average_block_time(blocks, ADJUSTMENT_INTERVAL);
        let next = Self::adjust(current_difficulty, average, target_time as f64);
        if next != current_difficulty {
            info!(
                "Difficulty adjustment at height {}: {current_difficulty} -> {next} (average block time: {average:.2}s, target: {target_time}s)",
                blocks.len()
            );
        }
        next
    }

    pub fn stats(blocks: &[Block], current_difficulty: u32) -> DifficultyStats {
        let blocks_until_adjustment = if blocks.len() < ADJUSTMENT_INTERVAL {
            ADJUSTMENT_INTERVAL - blocks.len()
        } else {
            ADJUSTMENT_INTERVAL - (blocks.len() % ADJUSTMENT_INTERVAL)
        };

        DifficultyStats {
            current_difficulty,
            average_block_time: Self::average_block_time(blocks, ADJUSTMENT_INTERVAL),
            target_block_time: TARGET_BLOCK_TIME,
            blocks_until_adjustment,
        }
    }
}
