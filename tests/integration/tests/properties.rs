//! Property tests over random pool activity

use prizevault_common::{ReceiverId, UFix64};
use prizevault_engine::invariants;
use prizevault_engine::PrizeDistribution;
use prizevault_integration_tests::{strategy, TestPool};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Step {
    Deposit { receiver: ReceiverId, raw: u64 },
    WithdrawHalf { receiver: ReceiverId },
    Yield { raw: u64 },
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (1u64..6, 100_000_000u64..10_000_000_000)
            .prop_map(|(receiver, raw)| Step::Deposit { receiver, raw }),
        (1u64..6).prop_map(|receiver| Step::WithdrawHalf { receiver }),
        (1u64..5_000_000_000).prop_map(|raw| Step::Yield { raw }),
    ]
}

fn apply(t: &mut TestPool, step: &Step, now: u64) {
    match *step {
        Step::Deposit { receiver, raw } => {
            t.pool.deposit(receiver, UFix64::from_raw(raw), now).unwrap();
        }
        Step::WithdrawHalf { receiver } => {
            let shares = t
                .pool
                .receiver_info(receiver, now)
                .map(|info| info.shares)
                .unwrap_or_default();
            let half = UFix64::from_raw(shares.raw() / 2);
            if !half.is_zero() {
                t.pool.withdraw(receiver, half, now).unwrap();
            }
        }
        Step::Yield { raw } => t.venue.inject_yield(UFix64::from_raw(raw)),
    }
}

proptest! {
    /// Without losses the share price never falls and every sync balances the books
    #[test]
    fn prop_price_monotonic_and_books_balance(steps in prop::collection::vec(step(), 1..40)) {
        let mut t = TestPool::new(
            1_000,
            strategy("0.5", "0.4", "0.1"),
            PrizeDistribution::single_winner(),
        );
        let mut price = t.pool.share_price();
        for (i, s) in steps.iter().enumerate() {
            let now = i as u64 * 10;
            apply(&mut t, s, now);
            t.pool.sync_with_yield_source(now).unwrap();

            let next = t.pool.share_price();
            prop_assert!(invariants::share_price_not_decreased(price, next));
            prop_assert!(invariants::allocations_match_venue(&t.pool));
            price = next;
        }
    }

    /// Finalized weights add up to the per-receiver weights seen at round end
    #[test]
    fn prop_draw_weight_matches_receivers(steps in prop::collection::vec(step(), 1..30)) {
        let mut t = TestPool::new(
            1_000,
            strategy("0", "1", "0"),
            PrizeDistribution::single_winner(),
        );
        for (i, s) in steps.iter().enumerate() {
            apply(&mut t, s, i as u64 * 20);
        }

        let ids: Vec<_> = t.pool.receiver_ids().collect();
        let weights: Vec<_> = ids
            .iter()
            .map(|id| t.pool.receiver_info(*id, 1_000).unwrap().current_weight)
            .collect();
        let result = t.run_draw(1_000, 3).unwrap();
        prop_assert!(invariants::weights_conserved(&weights, result.total_weight));
        prop_assert!(invariants::allocations_covered(&t.pool));
        prop_assert_eq!(
            result.total_paid.checked_add(result.rolled_over),
            Some(result.prize_pool)
        );
    }
}
