//! Financial invariant checks
//!
//! Pure predicates over pool state, used by debug assertions and tests.

use crate::state::Pool;
use crate::strategy::{PrizePlan, YieldSplit};
use prizevault_common::{UFix64, Weight};

/// Split parts sum exactly to the yield they came from
pub fn conservation_ok(split: &YieldSplit, total_yield: UFix64) -> bool {
    split.total() == Some(total_yield)
}

/// Right after a sync, allocated funds equal the venue balance
pub fn allocations_match_venue(pool: &Pool) -> bool {
    pool.total_allocated_funds()
        .map(|allocated| allocated == pool.yield_source_balance())
        .unwrap_or(false)
}

/// Allocated funds never exceed what the venue holds at a synced instant
pub fn allocations_covered(pool: &Pool) -> bool {
    pool.total_allocated_funds()
        .map(|allocated| allocated <= pool.yield_source_balance())
        .unwrap_or(false)
}

/// Payouts plus rollover account for the whole prize pool
pub fn prize_plan_conserved(plan: &PrizePlan, prize_pool: UFix64) -> bool {
    plan.total_paid.checked_add(plan.rolled_over) == Some(prize_pool)
        && UFix64::checked_sum(plan.payouts.iter().map(|p| p.amount)) == Some(plan.total_paid)
}

/// Per-receiver weights sum to the pool-wide weight
pub fn weights_conserved(receiver_weights: &[Weight], pool_weight: Weight) -> bool {
    receiver_weights
        .iter()
        .fold(0u128, |acc, w| acc.saturating_add(*w))
        == pool_weight
}

/// Share price may only fall through a recognized deficit
pub fn share_price_not_decreased(before: UFix64, after: UFix64) -> bool {
    after >= before
}
