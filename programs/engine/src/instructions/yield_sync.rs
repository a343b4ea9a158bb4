//! Reconciliation of cached allocations against the live venue balance
//!
//! The pool tracks three buckets inside the venue: the depositors' ledger
//! (`vault.total_assets`), the prize pool and the pending protocol fee.
//! A sync distributes any surplus through the distribution strategy and
//! absorbs any deficit pro rata across the buckets, after which the buckets
//! sum exactly to the venue balance.

use crate::events::PoolEvent;
use crate::invariants;
use crate::state::{Operation, PendingYield, Pool};
use crate::strategy::YieldSplit;
use prizevault_common::{PrizeVaultError, Timestamp, UFix64};

/// What a sync did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Balanced,
    Distributed(YieldSplit),
    Absorbed(YieldSplit),
}

impl Pool {
    pub fn yield_source_balance(&self) -> UFix64 {
        self.venue.balance()
    }

    /// Depositor assets + prize pool + pending protocol fee
    pub fn total_allocated_funds(&self) -> Result<UFix64, PrizeVaultError> {
        UFix64::checked_sum([
            self.vault.total_assets(),
            self.allocated_prize_yield,
            self.allocated_protocol_fee,
        ])
        .ok_or(PrizeVaultError::Overflow)
    }

    pub fn pending_yield(&self) -> PendingYield {
        let balance = self.venue.balance();
        let allocated = self.total_allocated_funds().unwrap_or(UFix64::MAX);
        if balance > allocated {
            PendingYield::Surplus(balance.saturating_sub(allocated))
        } else if balance < allocated {
            PendingYield::Deficit(allocated.saturating_sub(balance))
        } else {
            PendingYield::Balanced
        }
    }

    pub fn needs_sync(&self) -> bool {
        self.pending_yield() != PendingYield::Balanced
    }

    /// Venue balance / allocated funds, 1.0 when nothing is allocated
    pub fn yield_source_health(&self) -> UFix64 {
        let allocated = self.total_allocated_funds().unwrap_or(UFix64::MAX);
        if allocated.is_zero() {
            return UFix64::ONE;
        }
        self.venue
            .balance()
            .div(allocated)
            .unwrap_or(UFix64::ONE)
            .min(UFix64::ONE)
    }

    /// Bring allocations in line with the venue; idempotent
    pub fn sync_with_yield_source(&mut self, now: Timestamp) -> Result<SyncOutcome, PrizeVaultError> {
        self.emergency.check(Operation::Sync)?;
        let health = self.yield_source_health();

        let outcome = match self.pending_yield() {
            PendingYield::Balanced => SyncOutcome::Balanced,
            PendingYield::Surplus(surplus) => SyncOutcome::Distributed(self.distribute_surplus(surplus)?),
            PendingYield::Deficit(deficit) => SyncOutcome::Absorbed(self.absorb_deficit(deficit)?),
        };
        debug_assert!(invariants::allocations_match_venue(self));

        let transition = self.emergency.observe_health(health, now);
        self.apply_emergency(transition);
        Ok(outcome)
    }

    fn distribute_surplus(&mut self, surplus: UFix64) -> Result<YieldSplit, PrizeVaultError> {
        let mut split = self.config.distribution.calculate(surplus);
        debug_assert!(invariants::conservation_ok(&split, surplus));

        // Nobody holds shares: the rewards part has no owner, so it joins the prize
        if self.vault.total_shares().is_zero() {
            split.prize = split.prize.try_add(split.rewards)?;
            split.rewards = UFix64::ZERO;
        }

        let prize = self.allocated_prize_yield.try_add(split.prize)?;
        let fee = self.allocated_protocol_fee.try_add(split.protocol_fee)?;
        let total_rewards = self.total_rewards_distributed.try_add(split.rewards)?;
        self.vault.accrue_rewards(split.rewards)?;
        self.allocated_prize_yield = prize;
        self.allocated_protocol_fee = fee;
        self.total_rewards_distributed = total_rewards;

        self.emit(PoolEvent::YieldDistributed {
            pool_id: self.id,
            rewards: split.rewards,
            prize: split.prize,
            protocol_fee: split.protocol_fee,
        });
        log::debug!(
            "pool {}: distributed yield {} (rewards {}, prize {}, fee {})",
            self.id,
            surplus,
            split.rewards,
            split.prize,
            split.protocol_fee
        );
        Ok(split)
    }

    fn absorb_deficit(&mut self, deficit: UFix64) -> Result<YieldSplit, PrizeVaultError> {
        let allocated = self.total_allocated_funds()?;
        let deficit = deficit.min(allocated);
        let share = |bucket: UFix64| {
            deficit
                .mul_div(bucket, allocated)
                .unwrap_or(bucket)
                .min(bucket)
        };

        let mut loss = YieldSplit {
            rewards: UFix64::ZERO,
            prize: share(self.allocated_prize_yield),
            protocol_fee: share(self.allocated_protocol_fee),
        };
        // Rounding remainder lands on the depositor ledger, spilling over if short
        let mut rest = deficit.saturating_sub(loss.prize).saturating_sub(loss.protocol_fee);
        loss.rewards = rest.min(self.vault.total_assets());
        rest = rest.saturating_sub(loss.rewards);
        let prize_room = self.allocated_prize_yield.saturating_sub(loss.prize);
        let extra = rest.min(prize_room);
        loss.prize = loss.prize.saturating_add(extra);
        rest = rest.saturating_sub(extra);
        loss.protocol_fee = loss.protocol_fee.saturating_add(rest);

        self.vault.absorb_deficit(loss.rewards);
        self.allocated_prize_yield = self.allocated_prize_yield.saturating_sub(loss.prize);
        self.allocated_protocol_fee = self.allocated_protocol_fee.saturating_sub(loss.protocol_fee);

        self.emit(PoolEvent::DeficitAbsorbed {
            pool_id: self.id,
            rewards: loss.rewards,
            prize: loss.prize,
            protocol_fee: loss.protocol_fee,
        });
        log::warn!(
            "pool {}: absorbed deficit {} (rewards {}, prize {}, fee {})",
            self.id,
            deficit,
            loss.rewards,
            loss.prize,
            loss.protocol_fee
        );
        Ok(loss)
    }

    /// Send the pending protocol fee to the configured recipient
    pub fn forward_protocol_fee(&mut self, now: Timestamp) -> Result<UFix64, PrizeVaultError> {
        self.emergency.check(Operation::ForwardFee)?;
        if self.protocol_fee_recipient.is_none() {
            return Err(PrizeVaultError::NoFeeRecipient);
        }
        self.sync_with_yield_source(now)?;
        self.emergency.check(Operation::ForwardFee)?;
        Ok(self.forward_fee_best_effort())
    }

    /// Move as much of the pending fee out of the venue as it will release
    pub(crate) fn forward_fee_best_effort(&mut self) -> UFix64 {
        let recipient = match &self.protocol_fee_recipient {
            Some(r) => r.clone(),
            None => return UFix64::ZERO,
        };
        let pending = self.allocated_protocol_fee;
        if pending.is_zero() {
            return UFix64::ZERO;
        }

        let released = self.venue.withdraw(pending);
        self.allocated_protocol_fee = pending.saturating_sub(released);
        self.total_protocol_fee_forwarded = self.total_protocol_fee_forwarded.saturating_add(released);
        if released < pending {
            log::warn!(
                "pool {}: forwarded {} of pending fee {} to {}",
                self.id,
                released,
                pending,
                recipient
            );
        } else {
            log::info!("pool {}: forwarded fee {} to {}", self.id, released, recipient);
        }
        if !released.is_zero() {
            self.emit(PoolEvent::ProtocolFeeForwarded {
                pool_id: self.id,
                recipient,
                amount: released,
            });
        }
        released
    }
}

#[cfg(test)]
mod tests {
    use super::SyncOutcome;
    use crate::mocks::{BlockRandomnessOracle, MockYieldVenue};
    use crate::state::{EmergencyState, PendingYield, Pool, PoolConfig};
    use crate::strategy::{DistributionStrategy, PrizeDistribution};
    use prizevault_common::{PrizeVaultError, UFix64};

    fn ufix(s: &str) -> UFix64 {
        s.parse().unwrap()
    }

    fn setup() -> (Pool, MockYieldVenue) {
        let venue = MockYieldVenue::new();
        let config = PoolConfig::new(
            "USDC",
            ufix("1"),
            100,
            DistributionStrategy::new(ufix("0.5"), ufix("0.4"), ufix("0.1")).unwrap(),
            PrizeDistribution::single_winner(),
        );
        let pool = Pool::new(
            1,
            config,
            Box::new(venue.clone()),
            Box::new(BlockRandomnessOracle::new(1)),
            0,
        )
        .unwrap();
        (pool, venue)
    }

    #[test]
    fn test_surplus_split() {
        let (mut pool, venue) = setup();
        pool.deposit(1, ufix("100"), 0).unwrap();
        venue.inject_yield(ufix("10"));
        assert_eq!(pool.pending_yield(), PendingYield::Surplus(ufix("10")));
        assert!(pool.needs_sync());

        pool.sync_with_yield_source(1).unwrap();
        assert_eq!(pool.vault.total_assets(), ufix("105"));
        assert_eq!(pool.prize_pool_balance(), ufix("4"));
        assert_eq!(pool.protocol_fee_stats().pending, ufix("1"));
        assert!(!pool.needs_sync());

        // second sync is a no-op
        assert_eq!(pool.sync_with_yield_source(2).unwrap(), SyncOutcome::Balanced);
    }

    #[test]
    fn test_rewards_without_depositors_go_to_prize() {
        let (mut pool, venue) = setup();
        venue.inject_yield(ufix("10"));
        pool.sync_with_yield_source(1).unwrap();
        assert_eq!(pool.prize_pool_balance(), ufix("9"));
        assert_eq!(pool.protocol_fee_stats().pending, ufix("1"));
        assert!(!pool.needs_sync());
    }

    #[test]
    fn test_deficit_absorbed_pro_rata() {
        let (mut pool, venue) = setup();
        pool.deposit(1, ufix("80"), 0).unwrap();
        venue.inject_yield(ufix("40"));
        pool.sync_with_yield_source(1).unwrap();
        // assets 100, prize 16, fee 4 -> total 120
        venue.inject_loss(ufix("12"));
        assert_eq!(pool.pending_yield(), PendingYield::Deficit(ufix("12")));

        pool.sync_with_yield_source(2).unwrap();
        assert_eq!(pool.vault.total_assets(), ufix("90"));
        assert_eq!(pool.prize_pool_balance(), ufix("14.4"));
        assert_eq!(pool.protocol_fee_stats().pending, ufix("3.6"));
        assert_eq!(pool.emergency_state(), EmergencyState::Normal);
    }

    #[test]
    fn test_severe_loss_enters_emergency() {
        let (mut pool, venue) = setup();
        pool.deposit(1, ufix("100"), 0).unwrap();
        venue.inject_loss(ufix("60"));
        pool.sync_with_yield_source(1).unwrap();
        assert_eq!(pool.emergency_state(), EmergencyState::EmergencyMode);
        assert_eq!(pool.vault.total_assets(), ufix("40"));
        assert!(pool.deposit(2, ufix("10"), 2).is_err());
    }

    #[test]
    fn test_forward_fee_requires_recipient() {
        let (mut pool, venue) = setup();
        pool.deposit(1, ufix("100"), 0).unwrap();
        venue.inject_yield(ufix("10"));
        assert_eq!(pool.forward_protocol_fee(1), Err(PrizeVaultError::NoFeeRecipient));

        pool.set_protocol_fee_recipient("treasury", 1).unwrap();
        assert_eq!(pool.forward_protocol_fee(2).unwrap(), ufix("1"));
        let stats = pool.protocol_fee_stats();
        assert_eq!(stats.total_forwarded, ufix("1"));
        assert_eq!(stats.pending, UFix64::ZERO);
        assert!(stats.has_recipient);
        assert!(!pool.needs_sync());
    }
}
