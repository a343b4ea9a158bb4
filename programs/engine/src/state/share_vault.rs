//! Share-based ledger for the rewards portion of the pool
//!
//! Depositors own shares; the share price is `total_assets / total_shares`
//! and is never stored. Rewards raise `total_assets` without minting shares,
//! which is how passive yield reaches every holder. Conversions round in the
//! pool's favour: deposits mint shares rounded down, redemptions pay assets
//! rounded down, and asset-denominated withdrawals burn shares rounded up.

use prizevault_common::{PrizeVaultError, ReceiverId, UFix64};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareVault {
    total_assets: UFix64,
    total_shares: UFix64,
    user_shares: BTreeMap<ReceiverId, UFix64>,
}

impl ShareVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_assets(&self) -> UFix64 {
        self.total_assets
    }

    pub fn total_shares(&self) -> UFix64 {
        self.total_shares
    }

    pub fn shares_of(&self, receiver: ReceiverId) -> UFix64 {
        self.user_shares.get(&receiver).copied().unwrap_or_default()
    }

    /// Current asset value of a receiver's shares
    pub fn assets_of(&self, receiver: ReceiverId) -> UFix64 {
        self.preview_withdraw(self.shares_of(receiver))
    }

    /// 1.0 when no shares exist
    pub fn share_price(&self) -> UFix64 {
        if self.total_shares.is_zero() {
            return UFix64::ONE;
        }
        self.total_assets
            .div(self.total_shares)
            .unwrap_or(UFix64::MAX)
    }

    /// Shares minted for depositing `amount` at the current price
    pub fn preview_deposit(&self, amount: UFix64) -> Result<UFix64, PrizeVaultError> {
        if self.total_shares.is_zero() {
            return Ok(amount);
        }
        if self.total_assets.is_zero() {
            return Err(PrizeVaultError::InvalidAmount(
                "vault has outstanding shares but no assets".into(),
            ));
        }
        amount
            .mul_div(self.total_shares, self.total_assets)
            .ok_or(PrizeVaultError::Overflow)
    }

    /// Assets released for burning `shares`
    pub fn preview_withdraw(&self, shares: UFix64) -> UFix64 {
        if self.total_shares.is_zero() {
            return UFix64::ZERO;
        }
        shares
            .mul_div(self.total_assets, self.total_shares)
            .unwrap_or(self.total_assets)
            .min(self.total_assets)
    }

    /// Shares that must be burned to release exactly `amount`
    pub fn shares_for_assets(&self, amount: UFix64) -> Result<UFix64, PrizeVaultError> {
        if self.total_assets.is_zero() {
            return Err(PrizeVaultError::InsufficientBalance {
                requested: amount,
                available: UFix64::ZERO,
            });
        }
        amount
            .mul_div_ceil(self.total_shares, self.total_assets)
            .ok_or(PrizeVaultError::Overflow)
    }

    /// Mint shares for `amount` of new assets
    pub fn deposit(&mut self, receiver: ReceiverId, amount: UFix64) -> Result<UFix64, PrizeVaultError> {
        let shares = self.preview_deposit(amount)?;
        if shares.is_zero() {
            return Err(PrizeVaultError::InvalidAmount(format!(
                "deposit of {} is too small to mint shares",
                amount
            )));
        }

        let total_assets = self.total_assets.try_add(amount)?;
        let total_shares = self.total_shares.try_add(shares)?;
        let user = self.shares_of(receiver).try_add(shares)?;

        self.total_assets = total_assets;
        self.total_shares = total_shares;
        self.user_shares.insert(receiver, user);
        Ok(shares)
    }

    /// Burn `shares` and return the assets they were worth
    pub fn withdraw(&mut self, receiver: ReceiverId, shares: UFix64) -> Result<UFix64, PrizeVaultError> {
        let held = self.shares_of(receiver);
        if shares > held {
            return Err(PrizeVaultError::InsufficientBalance {
                requested: shares,
                available: held,
            });
        }

        let amount = self.preview_withdraw(shares);
        self.total_assets = self.total_assets.try_sub(amount)?;
        self.total_shares = self.total_shares.try_sub(shares)?;
        let remaining = held.saturating_sub(shares);
        if remaining.is_zero() {
            self.user_shares.remove(&receiver);
        } else {
            self.user_shares.insert(receiver, remaining);
        }
        Ok(amount)
    }

    /// Raise `total_assets` without minting; returns false (and does nothing)
    /// when there are no shares to credit.
    pub fn accrue_rewards(&mut self, amount: UFix64) -> Result<bool, PrizeVaultError> {
        if self.total_shares.is_zero() {
            return Ok(false);
        }
        self.total_assets = self.total_assets.try_add(amount)?;
        Ok(true)
    }

    /// Reduce `total_assets` by up to `amount`, returning what was absorbed
    pub fn absorb_deficit(&mut self, amount: UFix64) -> UFix64 {
        let absorbed = amount.min(self.total_assets);
        self.total_assets = self.total_assets.saturating_sub(absorbed);
        absorbed
    }

    pub fn holders(&self) -> impl Iterator<Item = (&ReceiverId, &UFix64)> {
        self.user_shares.iter()
    }
}
