//! Share and asset denominated withdrawals

use crate::events::PoolEvent;
use crate::state::{Operation, Pool};
use prizevault_common::{PrizeVaultError, ReceiverId, Timestamp, UFix64};

impl Pool {
    /// Assets `shares` would release right now
    pub fn preview_withdraw(&self, shares: UFix64) -> UFix64 {
        self.vault.preview_withdraw(shares)
    }

    /// Burn `shares` and pay out their current value
    pub fn withdraw(&mut self, receiver: ReceiverId, shares: UFix64, now: Timestamp) -> Result<UFix64, PrizeVaultError> {
        self.check_withdraw(receiver, shares, now)?;
        self.sync_with_yield_source(now)?;
        self.emergency.check(Operation::Withdraw)?;
        self.withdraw_shares(receiver, shares, now)
    }

    /// Withdraw exactly `amount` of assets, burning the shares it costs
    /// (rounded up)
    pub fn withdraw_amount(
        &mut self,
        receiver: ReceiverId,
        amount: UFix64,
        now: Timestamp,
    ) -> Result<UFix64, PrizeVaultError> {
        if amount.is_zero() {
            return Err(PrizeVaultError::InvalidAmount("withdraw amount must be positive".into()));
        }
        if !self.is_registered(receiver) {
            return Err(PrizeVaultError::ReceiverNotFound(receiver));
        }
        self.ensure_funds_movable(now)?;
        self.emergency.check(Operation::Withdraw)?;

        self.sync_with_yield_source(now)?;
        self.emergency.check(Operation::Withdraw)?;

        let available = self.vault.assets_of(receiver);
        if amount > available {
            return Err(PrizeVaultError::InsufficientBalance {
                requested: amount,
                available,
            });
        }
        let shares = self
            .vault
            .shares_for_assets(amount)?
            .min(self.vault.shares_of(receiver));
        self.withdraw_shares(receiver, shares, now)
    }

    fn check_withdraw(&self, receiver: ReceiverId, shares: UFix64, now: Timestamp) -> Result<(), PrizeVaultError> {
        if shares.is_zero() {
            return Err(PrizeVaultError::InvalidAmount("withdraw shares must be positive".into()));
        }
        if !self.is_registered(receiver) {
            return Err(PrizeVaultError::ReceiverNotFound(receiver));
        }
        let held = self.vault.shares_of(receiver);
        if shares > held {
            return Err(PrizeVaultError::InsufficientBalance {
                requested: shares,
                available: held,
            });
        }
        self.ensure_funds_movable(now)?;
        self.emergency.check(Operation::Withdraw)
    }

    /// Ledger and venue half of a withdrawal; all-or-nothing
    fn withdraw_shares(&mut self, receiver: ReceiverId, shares: UFix64, now: Timestamp) -> Result<UFix64, PrizeVaultError> {
        let mut vault = self.vault.clone();
        let amount = vault.withdraw(receiver, shares)?;

        if !amount.is_zero() {
            let released = self.venue.withdraw(amount);
            if released < amount {
                // Return what came out and leave the ledger untouched
                if !released.is_zero() {
                    self.venue.deposit(released)?;
                }
                log::warn!(
                    "pool {}: venue released {} of {} for receiver {}",
                    self.id,
                    released,
                    amount,
                    receiver
                );
                let transition = self.emergency.record_withdraw_failure(now);
                self.apply_emergency(transition);
                return Err(PrizeVaultError::VenueShortfall {
                    requested: amount,
                    released,
                });
            }
        }

        let old = self.effective_balance(receiver);
        self.vault = vault;
        self.emergency.record_withdraw_success();
        self.record_balance_change(receiver, old, now);

        self.emit(PoolEvent::Withdrawn {
            pool_id: self.id,
            receiver,
            amount,
            shares,
        });
        log::debug!(
            "pool {}: receiver {} withdrew {} ({} shares)",
            self.id,
            receiver,
            amount,
            shares
        );
        Ok(amount)
    }
}

#[cfg(test)]
mod tests {
    use crate::interfaces::YieldVenue;
    use crate::mocks::{BlockRandomnessOracle, MockYieldVenue};
    use crate::state::{EmergencyConfig, EmergencyState, Pool, PoolConfig};
    use crate::strategy::{DistributionStrategy, PrizeDistribution};
    use prizevault_common::{ErrorKind, PrizeVaultError, UFix64};

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
        )
        .with_emergency(EmergencyConfig {
            max_withdraw_failures: 2,
            ..Default::default()
        });
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
    fn test_withdraw_with_rewards() {
        let (mut pool, venue) = setup();
        pool.deposit(1, ufix("100"), 0).unwrap();
        venue.inject_yield(ufix("10"));

        let amount = pool.withdraw(1, ufix("100"), 5).unwrap();
        assert_eq!(amount, ufix("105"));
        assert_eq!(venue.balance(), ufix("5"));
        // registration survives a full withdrawal
        assert!(pool.is_registered(1));
        assert_eq!(pool.receiver_info(1, 5).unwrap().shares, UFix64::ZERO);
    }

    #[test]
    fn test_withdraw_more_than_held() {
        let (mut pool, _) = setup();
        pool.deposit(1, ufix("10"), 0).unwrap();
        let err = pool.withdraw(1, ufix("11"), 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
        assert_eq!(pool.withdraw(2, ufix("1"), 1), Err(PrizeVaultError::ReceiverNotFound(2)));
    }

    #[test]
    fn test_withdraw_amount_burns_rounded_up() {
        let (mut pool, venue) = setup();
        pool.deposit(1, ufix("3"), 0).unwrap();
        // 2 yield -> 1 reward: price 4/3
        venue.inject_yield(ufix("2"));
        pool.sync_with_yield_source(1).unwrap();

        let paid = pool.withdraw_amount(1, ufix("1"), 2).unwrap();
        assert!(paid >= ufix("1"));
        assert_eq!(pool.receiver_info(1, 2).unwrap().shares, ufix("2.25"));
    }

    #[test]
    fn test_venue_shortfall_leaves_state_unchanged() {
        let (mut pool, venue) = setup();
        pool.deposit(1, ufix("100"), 0).unwrap();
        venue.set_liquidity_limit(Some(ufix("40")));

        let err = pool.withdraw(1, ufix("50"), 1).unwrap_err();
        assert_eq!(
            err,
            PrizeVaultError::VenueShortfall {
                requested: ufix("50"),
                released: ufix("40")
            }
        );
        assert_eq!(venue.balance(), ufix("100"));
        assert_eq!(pool.receiver_info(1, 1).unwrap().shares, ufix("100"));
        assert_eq!(pool.emergency_info().consecutive_withdraw_failures, 1);

        // second failure trips emergency mode; withdrawals stay allowed
        assert!(pool.withdraw(1, ufix("50"), 2).is_err());
        assert_eq!(pool.emergency_state(), EmergencyState::EmergencyMode);
        venue.set_liquidity_limit(None);
        assert_eq!(pool.withdraw(1, ufix("50"), 3).unwrap(), ufix("50"));
    }
}
