//! Deposit, sponsor deposit and direct prize funding

use crate::events::PoolEvent;
use crate::state::{Operation, Pool, Receiver};
use prizevault_common::{PrizeVaultError, ReceiverId, Timestamp, UFix64};

impl Pool {
    /// Shares that `amount` would mint right now
    pub fn preview_deposit(&self, amount: UFix64) -> Result<UFix64, PrizeVaultError> {
        self.vault.preview_deposit(amount)
    }

    /// Deposit `amount` for a lottery-eligible receiver
    ///
    /// Registers the receiver on first deposit. Returns the shares minted.
    pub fn deposit(&mut self, receiver: ReceiverId, amount: UFix64, now: Timestamp) -> Result<UFix64, PrizeVaultError> {
        self.deposit_inner(receiver, amount, now, false)
    }

    /// Deposit for a sponsor: earns rewards, never wins prizes
    pub fn deposit_as_sponsor(
        &mut self,
        receiver: ReceiverId,
        amount: UFix64,
        now: Timestamp,
    ) -> Result<UFix64, PrizeVaultError> {
        self.deposit_inner(receiver, amount, now, true)
    }

    fn deposit_inner(
        &mut self,
        receiver: ReceiverId,
        amount: UFix64,
        now: Timestamp,
        sponsor: bool,
    ) -> Result<UFix64, PrizeVaultError> {
        // Validation before anything moves
        if amount.is_zero() {
            return Err(PrizeVaultError::InvalidAmount("deposit amount must be positive".into()));
        }
        if amount < self.config.minimum_deposit {
            return Err(PrizeVaultError::BelowMinimumDeposit {
                amount,
                minimum: self.config.minimum_deposit,
            });
        }
        if let Some(existing) = self.receivers.get(&receiver) {
            if existing.is_sponsor != sponsor {
                return Err(PrizeVaultError::ReceiverRoleMismatch(receiver));
            }
        }
        self.ensure_funds_movable(now)?;
        self.emergency.check_deposit(amount)?;

        self.sync_with_yield_source(now)?;
        self.emergency.check_deposit(amount)?;

        // Conversion fails before the venue sees any funds
        if self.vault.preview_deposit(amount)?.is_zero() {
            return Err(PrizeVaultError::InvalidAmount(format!(
                "deposit of {} is too small to mint shares",
                amount
            )));
        }
        self.venue.deposit(amount)?;

        let old = self.effective_balance(receiver);
        let shares = match self.vault.deposit(receiver, amount) {
            Ok(shares) => shares,
            Err(e) => {
                self.venue.withdraw(amount);
                return Err(e);
            }
        };
        self.receivers
            .entry(receiver)
            .or_insert_with(|| Receiver::new(receiver, now, sponsor));
        self.record_balance_change(receiver, old, now);

        self.emit(PoolEvent::Deposited {
            pool_id: self.id,
            receiver,
            amount,
            shares,
            sponsor,
        });
        log::debug!(
            "pool {}: receiver {} deposited {} for {} shares",
            self.id,
            receiver,
            amount,
            shares
        );
        Ok(shares)
    }

    /// Add sponsored funds straight to the prize pool
    pub fn fund_prize_pool(&mut self, amount: UFix64, now: Timestamp) -> Result<(), PrizeVaultError> {
        if amount.is_zero() {
            return Err(PrizeVaultError::InvalidAmount("prize funding must be positive".into()));
        }
        self.emergency.check(Operation::FundPrize)?;
        self.sync_with_yield_source(now)?;
        self.emergency.check(Operation::FundPrize)?;

        let prize = self.allocated_prize_yield.try_add(amount)?;
        self.venue.deposit(amount)?;
        self.allocated_prize_yield = prize;

        self.emit(PoolEvent::PrizePoolFunded {
            pool_id: self.id,
            amount,
        });
        log::info!("pool {}: prize pool funded with {}", self.id, amount);
        Ok(())
    }
}
