//! End-to-end draw scenarios
//!
//! Each test drives a pool from deposits through a completed draw and checks
//! the ledgers against hand-computed figures.

use prizevault_common::{ErrorKind, NotReadyReason, PrizeVaultError, UFix64};
use prizevault_engine::invariants;
use prizevault_engine::{
    BlockRandomnessOracle, DrawPhase, MockYieldVenue, PoolConfig, PoolRegistry, PrizeDistribution,
    RandomnessMode, YieldVenue,
};
use prizevault_integration_tests::{strategy, ufix, TestPool};

/// Single depositor, 10 yield split 0.5 / 0.4 / 0.1 over a 10 second round
#[test]
fn test_single_depositor_wins_prize() {
    let mut t = TestPool::new(10, strategy("0.5", "0.4", "0.1"), PrizeDistribution::single_winner());
    t.pool.set_protocol_fee_recipient("treasury", 0).unwrap();
    t.pool.deposit(1, ufix("100"), 0).unwrap();
    t.venue.inject_yield(ufix("10"));

    assert_eq!(t.pool.state(10), DrawPhase::AwaitingDraw);
    let result = t.run_draw(10, 50).unwrap();

    let status = t.pool.status(10);
    assert_eq!(status.total_rewards_distributed, ufix("5"));
    assert_eq!(result.prize_pool, ufix("4"));
    assert_eq!(result.payouts.len(), 1);
    assert_eq!(result.payouts[0].receiver, 1);
    assert_eq!(result.payouts[0].amount, ufix("4"));
    assert_eq!(status.total_protocol_fee_forwarded, ufix("1"));

    // 100 principal + 5 rewards + 4 prize, less rounding in the share math
    let balance = t.pool.receiver_info(1, 10).unwrap().balance;
    assert!(balance <= ufix("109") && balance >= ufix("108.99999990"));
    assert_eq!(status.user_pool_balance, ufix("109"));
    assert_eq!(t.venue.balance(), ufix("109"));
    assert!(invariants::allocations_match_venue(&t.pool));
}

/// Percentage split 0.6 / 0.4 between two equal depositors
#[test]
fn test_percentage_split_pays_six_and_four() {
    let splits = [ufix("0.6"), ufix("0.4")];
    let mut t = TestPool::new(
        100,
        strategy("0", "1", "0"),
        PrizeDistribution::percentage_split(&splits).unwrap(),
    );
    t.pool.deposit(1, ufix("50"), 0).unwrap();
    t.pool.deposit(2, ufix("50"), 0).unwrap();
    t.pool.fund_prize_pool(ufix("10"), 0).unwrap();

    let result = t.run_draw(100, 1).unwrap();
    assert_eq!(result.payouts.len(), 2);
    assert_eq!(result.payouts[0].amount, ufix("6"));
    assert_eq!(result.payouts[1].amount, ufix("4"));
    assert_ne!(result.payouts[0].receiver, result.payouts[1].receiver);
    assert_eq!(result.total_paid, ufix("10"));
    assert_eq!(result.rolled_over, UFix64::ZERO);
}

/// Tiers [100, 25] x [1, 2] against a prize pool of 75 are scaled by half
#[test]
fn test_fixed_tiers_scale_to_pool() {
    let distribution = PrizeDistribution::fixed_amount_tiers(
        &[ufix("100"), ufix("25")],
        &[1, 2],
        &["grand", "runner-up"],
    )
    .unwrap();
    let mut t = TestPool::new(100, strategy("0", "1", "0"), distribution);
    for id in 1..=3 {
        t.pool.deposit(id, ufix("10"), 0).unwrap();
    }
    t.pool.fund_prize_pool(ufix("75"), 0).unwrap();

    let result = t.run_draw(100, 2).unwrap();
    let amounts: Vec<_> = result.payouts.iter().map(|p| p.amount).collect();
    assert_eq!(amounts, vec![ufix("50"), ufix("12.5"), ufix("12.5")]);
    assert_eq!(result.payouts[0].tier.as_deref(), Some("grand"));
    assert_eq!(result.total_paid, ufix("75"));

    let mut winners: Vec<_> = result.payouts.iter().map(|p| p.receiver).collect();
    winners.sort_unstable();
    assert_eq!(winners, vec![1, 2, 3]);
}

/// More prize slots than participants: unfilled slots roll over
#[test]
fn test_unfilled_slots_roll_over() {
    let splits = [ufix("0.5"), ufix("0.3"), ufix("0.2")];
    let mut t = TestPool::new(
        100,
        strategy("0", "1", "0"),
        PrizeDistribution::percentage_split(&splits).unwrap(),
    );
    t.pool.deposit(1, ufix("10"), 0).unwrap();
    t.pool.fund_prize_pool(ufix("10"), 0).unwrap();

    let result = t.run_draw(100, 10).unwrap();
    assert_eq!(result.payouts.len(), 1);
    assert_eq!(result.total_paid, ufix("5"));
    assert_eq!(result.rolled_over, ufix("5"));
    assert_eq!(t.pool.prize_pool_balance(), ufix("5"));
}

/// Complete before the batch finishes or before the reveal: nothing changes
#[test]
fn test_premature_completion_is_not_ready() {
    let mut t = TestPool::new(100, strategy("0.5", "0.4", "0.1"), PrizeDistribution::single_winner());
    t.pool.deposit(1, ufix("10"), 0).unwrap();
    t.pool.deposit(2, ufix("10"), 0).unwrap();
    t.venue.inject_yield(ufix("2"));

    t.pool.start_draw(100).unwrap();
    let before = t.pool.status(100);
    let err = t.pool.complete_draw(100).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotReady);
    assert!(err.is_retryable());
    assert_eq!(t.pool.status(100), before);

    assert!(t.pool.process_draw_batch(10, 100).unwrap().complete);
    let before = t.pool.status(100);
    assert!(matches!(
        t.pool.complete_draw(100),
        Err(PrizeVaultError::NotReady(NotReadyReason::RandomnessNotRevealed { .. }))
    ));
    assert_eq!(t.pool.status(100), before);
    assert_eq!(t.pool.state(100), DrawPhase::DrawProcessing);
}

/// Deposits and withdrawals bounce off a processing draw
#[test]
fn test_deposit_during_processing_rejected() {
    let mut t = TestPool::new(100, strategy("0.5", "0.4", "0.1"), PrizeDistribution::single_winner());
    t.pool.deposit(1, ufix("10"), 0).unwrap();
    t.pool.start_draw(100).unwrap();

    let before = t.pool.status(100);
    let err = t.pool.deposit(2, ufix("10"), 100).unwrap_err();
    assert_eq!(err, PrizeVaultError::DrawInProgress);
    assert_eq!(err.kind(), ErrorKind::StateViolation);
    assert_eq!(t.pool.status(100), before);
    assert!(!t.pool.is_registered(2));
}

/// A mid-round joiner is weighted only for the time they were in
#[test]
fn test_late_joiner_has_partial_weight() {
    let mut t = TestPool::new(100, strategy("0", "1", "0"), PrizeDistribution::single_winner());
    t.pool.deposit(1, ufix("10"), 0).unwrap();
    t.pool.fund_prize_pool(ufix("1"), 50).unwrap();
    t.pool.deposit(2, ufix("10"), 75).unwrap();

    let early = t.pool.receiver_info(1, 100).unwrap().current_weight;
    let late = t.pool.receiver_info(2, 100).unwrap().current_weight;
    assert_eq!(early, 4 * late);

    let result = t.run_draw(100, 10).unwrap();
    assert_eq!(result.total_weight, early + late);
}

/// Deposits during intermission count towards the next round
#[test]
fn test_intermission_deposit_joins_next_round() {
    let mut t = TestPool::new(100, strategy("0", "1", "0"), PrizeDistribution::single_winner());
    t.pool.deposit(1, ufix("10"), 0).unwrap();
    t.run_draw(100, 10).unwrap();
    assert_eq!(t.pool.state(100), DrawPhase::Intermission);

    t.pool.deposit(2, ufix("30"), 120).unwrap();
    let end = t.pool.start_next_round(150).unwrap();
    assert_eq!(end, 250);

    t.pool.fund_prize_pool(ufix("4"), 150).unwrap();
    let result = t.run_draw(250, 10).unwrap();
    assert_eq!(result.round_id, 2);
    assert_eq!(result.participants, 2);
    assert_eq!(result.total_weight, ufix("40").to_weight(100));
}

/// Lazy after-batch randomness with several batches
#[test]
fn test_after_batch_randomness_flow() {
    let config = PoolConfig::new(
        "USDC",
        ufix("1"),
        100,
        strategy("0.2", "0.8", "0"),
        PrizeDistribution::single_winner(),
    )
    .with_randomness_mode(RandomnessMode::AfterBatch);
    let mut t = TestPool::with_config(config, 5);
    for id in 1..=7 {
        t.pool.deposit(id, ufix("10"), 0).unwrap();
    }
    t.venue.inject_yield(ufix("7"));

    let result = t.run_draw(100, 3).unwrap();
    assert_eq!(result.participants, 7);
    assert_eq!(result.total_paid, ufix("5.6"));
    assert!(invariants::allocations_match_venue(&t.pool));
}

/// Deficit after a loss is absorbed and the draw still pays what is left
#[test]
fn test_loss_before_draw_shrinks_prize() {
    let mut t = TestPool::new(100, strategy("0.5", "0.4", "0.1"), PrizeDistribution::single_winner());
    t.pool.deposit(1, ufix("80"), 0).unwrap();
    t.venue.inject_yield(ufix("40"));
    t.pool.sync_with_yield_source(10).unwrap();
    // assets 100, prize 16, fee 4
    t.venue.inject_loss(ufix("12"));

    let result = t.run_draw(100, 10).unwrap();
    assert_eq!(result.prize_pool, ufix("14.4"));
    assert_eq!(t.pool.emergency_state(), prizevault_engine::EmergencyState::Normal);
    assert!(invariants::allocations_match_venue(&t.pool));
}

/// Same seed, same deposits: identical winners across pools
#[test]
fn test_draws_are_reproducible() {
    let make = || {
        let splits = [ufix("0.5"), ufix("0.3"), ufix("0.2")];
        let mut t = TestPool::new(
            100,
            strategy("0", "1", "0"),
            PrizeDistribution::percentage_split(&splits).unwrap(),
        );
        for id in 1..=10 {
            t.pool.deposit(id, UFix64::from_int(id * 10), 0).unwrap();
        }
        t.pool.fund_prize_pool(ufix("100"), 0).unwrap();
        t.run_draw(100, 4).unwrap()
    };
    let a = make();
    let b = make();
    assert_eq!(a.seed, b.seed);
    assert_eq!(a.payouts, b.payouts);
}

/// Pools in one registry are isolated from each other
#[test]
fn test_registry_pools_are_independent() {
    let mut registry = PoolRegistry::new();
    let venue_a = MockYieldVenue::new();
    let venue_b = MockYieldVenue::new();
    let config = PoolConfig::new(
        "USDC",
        ufix("1"),
        100,
        strategy("0.5", "0.5", "0"),
        PrizeDistribution::single_winner(),
    );
    let a = registry
        .create_pool(
            config.clone(),
            Box::new(venue_a.clone()),
            Box::new(BlockRandomnessOracle::new(1)),
            0,
        )
        .unwrap();
    let b = registry
        .create_pool(
            config,
            Box::new(venue_b.clone()),
            Box::new(BlockRandomnessOracle::new(2)),
            0,
        )
        .unwrap();

    registry.pool_mut(a).unwrap().deposit(1, ufix("10"), 0).unwrap();
    registry.pool_mut(b).unwrap().deposit(1, ufix("20"), 0).unwrap();
    venue_a.inject_yield(ufix("2"));
    registry.pool_mut(a).unwrap().sync_with_yield_source(1).unwrap();
    registry.pool_mut(b).unwrap().sync_with_yield_source(1).unwrap();

    assert_eq!(registry.pool(a).unwrap().prize_pool_balance(), ufix("1"));
    assert_eq!(registry.pool(b).unwrap().prize_pool_balance(), UFix64::ZERO);
    assert_eq!(registry.pool(b).unwrap().share_price(), UFix64::ONE);
    assert_eq!(registry.pool(99).unwrap_err().kind(), ErrorKind::NotFound);
}

/// Splits summing a hair over 1.0 still pay out exactly the prize pool
#[test]
fn test_split_just_over_one_completes() {
    let splits = [ufix("0.50000001"), ufix("0.5")];
    let mut t = TestPool::new(
        100,
        strategy("0", "1", "0"),
        PrizeDistribution::percentage_split(&splits).unwrap(),
    );
    t.pool.deposit(1, ufix("50"), 0).unwrap();
    t.pool.deposit(2, ufix("50"), 0).unwrap();
    t.pool.fund_prize_pool(ufix("100"), 0).unwrap();

    let result = t.run_draw(100, 1).unwrap();
    assert_eq!(result.payouts.len(), 2);
    assert_eq!(result.payouts[0].amount, ufix("50.000001"));
    assert_eq!(result.payouts[1].amount, ufix("49.999999"));
    assert_eq!(result.total_paid.checked_add(result.rolled_over), Some(result.prize_pool));
    assert_eq!(result.rolled_over, UFix64::ZERO);
    assert_eq!(t.pool.state(100), DrawPhase::Intermission);
    assert!(invariants::allocations_match_venue(&t.pool));
}

/// With the share price above 1.0 a one-unit prize buys no shares and stays in the pool
#[test]
fn test_dust_prize_rolls_over_above_par() {
    let mut t = TestPool::new(100, strategy("1", "0", "0"), PrizeDistribution::single_winner());
    t.pool.deposit(1, ufix("100"), 0).unwrap();
    t.venue.inject_yield(ufix("10"));
    t.pool.sync_with_yield_source(1).unwrap();
    assert_eq!(t.pool.share_price(), ufix("1.1"));

    let dust = UFix64::from_raw(1);
    t.pool.fund_prize_pool(dust, 1).unwrap();
    let result = t.run_draw(100, 10).unwrap();

    assert!(result.payouts.is_empty());
    assert_eq!(result.total_paid.checked_add(result.rolled_over), Some(result.prize_pool));
    assert_eq!(result.rolled_over, dust);
    assert_eq!(t.pool.state(100), DrawPhase::Intermission);
    assert_eq!(t.pool.prize_pool_balance(), dust);

    // Funds move again once the round closes
    t.pool.start_next_round(100).unwrap();
    t.pool.withdraw(1, ufix("50"), 101).unwrap();
}

/// Only the payout too small to mint a share rolls over; the other winner is paid
#[test]
fn test_mixed_dust_split_pays_minting_winner() {
    let splits = [ufix("0.99999999"), ufix("0.00000001")];
    let mut t = TestPool::new(
        100,
        strategy("1", "0", "0"),
        PrizeDistribution::percentage_split(&splits).unwrap(),
    );
    t.pool.deposit(1, ufix("50"), 0).unwrap();
    t.pool.deposit(2, ufix("50"), 0).unwrap();
    t.venue.inject_yield(ufix("10"));
    t.pool.sync_with_yield_source(1).unwrap();
    t.pool.fund_prize_pool(ufix("1"), 1).unwrap();

    let result = t.run_draw(100, 1).unwrap();
    assert_eq!(result.payouts.len(), 1);
    assert_eq!(result.payouts[0].amount, ufix("0.99999999"));
    assert_eq!(result.total_paid, ufix("0.99999999"));
    assert_eq!(result.rolled_over, UFix64::from_raw(1));
    assert_eq!(result.total_paid.checked_add(result.rolled_over), Some(result.prize_pool));

    let winner = result.payouts[0].receiver;
    let info = t.pool.receiver_info(winner, 100).unwrap();
    assert_eq!(info.lifetime_prizes, ufix("0.99999999"));
    assert!(invariants::allocations_match_venue(&t.pool));
}

/// Tiers scaled down to a dust pool never strand the draw
#[test]
fn test_scaled_dust_tiers_complete() {
    let dist =
        PrizeDistribution::fixed_amount_tiers(&[ufix("1"), ufix("1")], &[1, 1], &["a", "b"])
            .unwrap();
    let mut t = TestPool::new(100, strategy("1", "0", "0"), dist);
    t.pool.deposit(1, ufix("50"), 0).unwrap();
    t.pool.deposit(2, ufix("50"), 0).unwrap();
    t.venue.inject_yield(ufix("10"));
    t.pool.sync_with_yield_source(1).unwrap();
    t.pool.fund_prize_pool(UFix64::from_raw(3), 1).unwrap();

    let result = t.run_draw(100, 2).unwrap();
    assert!(result.payouts.is_empty());
    assert_eq!(result.rolled_over, UFix64::from_raw(3));
    assert_eq!(result.total_paid.checked_add(result.rolled_over), Some(result.prize_pool));
    assert_eq!(t.pool.state(100), DrawPhase::Intermission);
}
