//! Yield split between rewards, prize and protocol fee

use prizevault_common::{PrizeVaultError, UFix64};
use serde::{Deserialize, Serialize};

/// Percentages applied to every realized yield surplus
///
/// The three parts must sum to 1.0. One raw unit (1e-8) of slack is accepted
/// so that thirds and similar splits are expressible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DistributionPercents")]
pub struct DistributionStrategy {
    rewards_percent: UFix64,
    prize_percent: UFix64,
    protocol_fee_percent: UFix64,
}

/// Unvalidated serde shape of [`DistributionStrategy`]
#[derive(Debug, Clone, Copy, Deserialize)]
struct DistributionPercents {
    rewards_percent: UFix64,
    prize_percent: UFix64,
    protocol_fee_percent: UFix64,
}

impl TryFrom<DistributionPercents> for DistributionStrategy {
    type Error = PrizeVaultError;

    fn try_from(p: DistributionPercents) -> Result<Self, Self::Error> {
        DistributionStrategy::new(p.rewards_percent, p.prize_percent, p.protocol_fee_percent)
    }
}

/// Result of [`DistributionStrategy::calculate`]; parts always sum to the input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct YieldSplit {
    pub rewards: UFix64,
    pub prize: UFix64,
    pub protocol_fee: UFix64,
}

impl YieldSplit {
    pub fn total(&self) -> Option<UFix64> {
        UFix64::checked_sum([self.rewards, self.prize, self.protocol_fee])
    }
}

/// Everything to the prize pool
impl Default for DistributionStrategy {
    fn default() -> Self {
        Self {
            rewards_percent: UFix64::ZERO,
            prize_percent: UFix64::ONE,
            protocol_fee_percent: UFix64::ZERO,
        }
    }
}

impl DistributionStrategy {
    pub fn new(
        rewards_percent: UFix64,
        prize_percent: UFix64,
        protocol_fee_percent: UFix64,
    ) -> Result<Self, PrizeVaultError> {
        for (name, pct) in [
            ("rewards", rewards_percent),
            ("prize", prize_percent),
            ("protocol fee", protocol_fee_percent),
        ] {
            if pct > UFix64::ONE {
                return Err(PrizeVaultError::InvalidDistribution(format!(
                    "{} percent {} exceeds 1.0",
                    name, pct
                )));
            }
        }

        let sum = UFix64::checked_sum([rewards_percent, prize_percent, protocol_fee_percent])
            .ok_or(PrizeVaultError::Overflow)?;
        let diff = if sum > UFix64::ONE {
            sum.saturating_sub(UFix64::ONE)
        } else {
            UFix64::ONE.saturating_sub(sum)
        };
        if diff > UFix64::EPSILON {
            return Err(PrizeVaultError::InvalidDistribution(format!(
                "percentages sum to {}, expected 1.0",
                sum
            )));
        }

        Ok(Self {
            rewards_percent,
            prize_percent,
            protocol_fee_percent,
        })
    }

    /// Split `total_yield`; prize and fee round down, rewards take the remainder
    pub fn calculate(&self, total_yield: UFix64) -> YieldSplit {
        let part = |pct: UFix64, cap: UFix64| total_yield.mul(pct).unwrap_or(cap).min(cap);

        let prize = part(self.prize_percent, total_yield);
        let protocol_fee = part(self.protocol_fee_percent, total_yield.saturating_sub(prize));
        let rewards = total_yield.saturating_sub(prize).saturating_sub(protocol_fee);

        YieldSplit {
            rewards,
            prize,
            protocol_fee,
        }
    }

    pub fn rewards_percent(&self) -> UFix64 {
        self.rewards_percent
    }

    pub fn prize_percent(&self) -> UFix64 {
        self.prize_percent
    }

    pub fn protocol_fee_percent(&self) -> UFix64 {
        self.protocol_fee_percent
    }
}
