//! Weighted winner selection without replacement

use super::prize::MAX_WINNERS;
use arrayvec::ArrayVec;
use prizevault_common::{ReceiverId, Weight};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

/// A receiver's finalized TWAB weight for the round being drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedEntry {
    pub receiver: ReceiverId,
    pub weight: Weight,
}

/// Independent RNG for the `index`-th pick, derived from the revealed seed
pub fn draw_rng(seed: &[u8; 32], index: u64) -> ChaCha20Rng {
    let mut rng = ChaCha20Rng::from_seed(*seed);
    rng.set_stream(index);
    rng
}

/// Pick up to `count` distinct receivers, each with probability proportional
/// to its remaining weight.
///
/// Entries with zero weight are never picked. The result only depends on
/// `entries` (and their order), `count` and `seed`.
pub fn select_weighted_winners(
    entries: &[WeightedEntry],
    count: usize,
    seed: &[u8; 32],
) -> ArrayVec<ReceiverId, MAX_WINNERS> {
    let mut pool: Vec<WeightedEntry> = entries.iter().copied().filter(|e| e.weight > 0).collect();
    let mut remaining: Weight = pool.iter().fold(0, |acc, e| acc.saturating_add(e.weight));
    let mut winners = ArrayVec::new();

    let count = count.min(MAX_WINNERS).min(pool.len());
    for index in 0..count {
        if remaining == 0 {
            break;
        }
        let target = draw_rng(seed, index as u64).gen::<u128>() % remaining;

        let mut cumulative: Weight = 0;
        let pick = pool
            .iter()
            .position(|e| {
                cumulative = cumulative.saturating_add(e.weight);
                target < cumulative
            })
            .unwrap_or(pool.len() - 1);

        let winner = pool.remove(pick);
        remaining = remaining.saturating_sub(winner.weight);
        winners.push(winner.receiver);
    }

    winners
}
