//! Prize distribution policies
//!
//! A policy decides how many winners a draw selects and how the prize pool
//! is divided between them. Policies are pure: they read the prize pool and
//! the ordered winner list and return payouts. Anything not paid out stays
//! in the prize pool for the next round.

use arrayvec::ArrayVec;
use prizevault_common::{PrizeVaultError, ReceiverId, UFix64};
use serde::{Deserialize, Serialize};

/// Upper bound on winners per draw (bounds the work done by `complete_draw`)
pub const MAX_WINNERS: usize = 64;

/// One tier of a [`PrizeDistribution::FixedAmountTiers`] policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeTier {
    pub name: String,
    pub amount: UFix64,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PrizeDistributionConfig", into = "PrizeDistributionConfig")]
pub enum PrizeDistribution {
    /// One winner takes the whole pool
    SingleWinner,
    /// The i-th drawn winner receives `splits[i]` of the pool
    PercentageSplit { splits: ArrayVec<UFix64, MAX_WINNERS> },
    /// Fixed amounts per tier, scaled down when the pool cannot cover them
    FixedAmountTiers { tiers: ArrayVec<PrizeTier, MAX_WINNERS> },
}

/// Serde shape of [`PrizeDistribution`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum PrizeDistributionConfig {
    SingleWinner,
    PercentageSplit { splits: Vec<UFix64> },
    FixedAmountTiers { tiers: Vec<PrizeTier> },
}

impl TryFrom<PrizeDistributionConfig> for PrizeDistribution {
    type Error = PrizeVaultError;

    fn try_from(config: PrizeDistributionConfig) -> Result<Self, Self::Error> {
        match config {
            PrizeDistributionConfig::SingleWinner => Ok(PrizeDistribution::SingleWinner),
            PrizeDistributionConfig::PercentageSplit { splits } => {
                PrizeDistribution::percentage_split(&splits)
            }
            PrizeDistributionConfig::FixedAmountTiers { tiers } => {
                let tiers = bounded(tiers)?;
                let dist = PrizeDistribution::FixedAmountTiers { tiers };
                dist.validate()?;
                Ok(dist)
            }
        }
    }
}

impl From<PrizeDistribution> for PrizeDistributionConfig {
    fn from(dist: PrizeDistribution) -> Self {
        match dist {
            PrizeDistribution::SingleWinner => PrizeDistributionConfig::SingleWinner,
            PrizeDistribution::PercentageSplit { splits } => PrizeDistributionConfig::PercentageSplit {
                splits: splits.into_iter().collect(),
            },
            PrizeDistribution::FixedAmountTiers { tiers } => PrizeDistributionConfig::FixedAmountTiers {
                tiers: tiers.into_iter().collect(),
            },
        }
    }
}

fn bounded<T>(items: Vec<T>) -> Result<ArrayVec<T, MAX_WINNERS>, PrizeVaultError> {
    if items.len() > MAX_WINNERS {
        return Err(PrizeVaultError::InvalidPrizeDistribution(format!(
            "{} entries exceed the limit of {}",
            items.len(),
            MAX_WINNERS
        )));
    }
    Ok(items.into_iter().collect())
}

/// A single prize payout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub receiver: ReceiverId,
    pub amount: UFix64,
    /// Tier name for tiered policies
    pub tier: Option<String>,
}

/// Output of [`PrizeDistribution::distribute`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrizePlan {
    pub payouts: ArrayVec<Payout, MAX_WINNERS>,
    pub total_paid: UFix64,
    /// Left in the prize pool for the next round
    pub rolled_over: UFix64,
}

impl PrizePlan {
    /// Take the payouts of `receivers` out of the plan and roll them over
    pub fn roll_back(&mut self, receivers: &[ReceiverId]) -> Result<(), PrizeVaultError> {
        let mut returned = UFix64::ZERO;
        for payout in self.payouts.iter().filter(|p| receivers.contains(&p.receiver)) {
            returned = returned.try_add(payout.amount)?;
        }
        self.payouts.retain(|p| !receivers.contains(&p.receiver));
        self.total_paid = self.total_paid.try_sub(returned)?;
        self.rolled_over = self.rolled_over.try_add(returned)?;
        Ok(())
    }
}

impl Default for PrizeDistribution {
    fn default() -> Self {
        PrizeDistribution::SingleWinner
    }
}

impl PrizeDistribution {
    pub fn single_winner() -> Self {
        PrizeDistribution::SingleWinner
    }

    pub fn percentage_split(splits: &[UFix64]) -> Result<Self, PrizeVaultError> {
        let splits = bounded(splits.to_vec())?;
        let dist = PrizeDistribution::PercentageSplit { splits };
        dist.validate()?;
        Ok(dist)
    }

    /// Build tiers from parallel lists, in payout order
    pub fn fixed_amount_tiers(
        amounts: &[UFix64],
        counts: &[u32],
        names: &[&str],
    ) -> Result<Self, PrizeVaultError> {
        if amounts.len() != counts.len() || amounts.len() != names.len() {
            return Err(PrizeVaultError::InvalidPrizeDistribution(
                "amounts, counts and names must have the same length".into(),
            ));
        }
        let tiers = amounts
            .iter()
            .zip(counts)
            .zip(names)
            .map(|((&amount, &count), &name)| PrizeTier {
                name: name.to_string(),
                amount,
                count,
            })
            .collect::<Vec<_>>();
        let dist = PrizeDistribution::FixedAmountTiers {
            tiers: bounded(tiers)?,
        };
        dist.validate()?;
        Ok(dist)
    }

    pub fn validate(&self) -> Result<(), PrizeVaultError> {
        let invalid = |msg: String| Err(PrizeVaultError::InvalidPrizeDistribution(msg));
        match self {
            PrizeDistribution::SingleWinner => Ok(()),
            PrizeDistribution::PercentageSplit { splits } => {
                if splits.is_empty() {
                    return invalid("percentage split needs at least one split".into());
                }
                if splits.iter().any(|s| s.is_zero()) {
                    return invalid("percentage split contains a zero split".into());
                }
                let sum = UFix64::checked_sum(splits.iter().copied())
                    .ok_or(PrizeVaultError::Overflow)?;
                let diff = if sum > UFix64::ONE {
                    sum.saturating_sub(UFix64::ONE)
                } else {
                    UFix64::ONE.saturating_sub(sum)
                };
                if diff > UFix64::EPSILON {
                    return invalid(format!("splits sum to {}, expected 1.0", sum));
                }
                Ok(())
            }
            PrizeDistribution::FixedAmountTiers { tiers } => {
                if tiers.is_empty() {
                    return invalid("at least one tier is required".into());
                }
                for tier in tiers {
                    if tier.count == 0 || tier.amount.is_zero() {
                        return invalid(format!("tier {:?} has zero amount or count", tier.name));
                    }
                }
                if self.winner_count() > MAX_WINNERS {
                    return invalid(format!(
                        "{} winners exceed the limit of {}",
                        self.winner_count(),
                        MAX_WINNERS
                    ));
                }
                Ok(())
            }
        }
    }

    /// Distinct winners a draw tries to select
    pub fn winner_count(&self) -> usize {
        match self {
            PrizeDistribution::SingleWinner => 1,
            PrizeDistribution::PercentageSplit { splits } => splits.len(),
            PrizeDistribution::FixedAmountTiers { tiers } => {
                tiers.iter().map(|t| t.count as usize).sum()
            }
        }
    }

    /// Compute payouts for `winners` (in draw order) out of `prize_pool`
    ///
    /// Fewer winners than slots is allowed; unfilled slots roll over.
    pub fn distribute(
        &self,
        prize_pool: UFix64,
        winners: &[ReceiverId],
    ) -> Result<PrizePlan, PrizeVaultError> {
        if winners.len() > self.winner_count() {
            return Err(PrizeVaultError::InvalidPrizeDistribution(format!(
                "{} winners for {} slots",
                winners.len(),
                self.winner_count()
            )));
        }

        let mut payouts: ArrayVec<Payout, MAX_WINNERS> = ArrayVec::new();
        match self {
            PrizeDistribution::SingleWinner => {
                if let Some(&receiver) = winners.first() {
                    payouts.push(Payout {
                        receiver,
                        amount: prize_pool,
                        tier: None,
                    });
                }
            }
            PrizeDistribution::PercentageSplit { splits } => {
                // Splits may sum to a hair over 1.0; capping at what is left
                // keeps the total within the pool
                let mut left = prize_pool;
                for (&receiver, &split) in winners.iter().zip(splits) {
                    let amount = prize_pool
                        .mul(split)
                        .ok_or(PrizeVaultError::Overflow)?
                        .min(left);
                    left = left.saturating_sub(amount);
                    payouts.push(Payout {
                        receiver,
                        amount,
                        tier: None,
                    });
                }
                // All slots filled: truncation dust goes to the first winner
                if winners.len() == splits.len() {
                    let paid = UFix64::checked_sum(payouts.iter().map(|p| p.amount))
                        .ok_or(PrizeVaultError::Overflow)?;
                    let dust = prize_pool.saturating_sub(paid);
                    if let Some(first) = payouts.first_mut() {
                        first.amount = first.amount.try_add(dust)?;
                    }
                }
            }
            PrizeDistribution::FixedAmountTiers { tiers } => {
                let slots = tiers
                    .iter()
                    .flat_map(|t| (0..t.count).map(move |_| t))
                    .take(winners.len());
                let filled: Vec<&PrizeTier> = slots.collect();
                let requested = UFix64::checked_sum(filled.iter().map(|t| t.amount))
                    .ok_or(PrizeVaultError::Overflow)?;

                for (&receiver, tier) in winners.iter().zip(&filled) {
                    let amount = if requested > prize_pool {
                        tier.amount
                            .mul_div(prize_pool, requested)
                            .ok_or(PrizeVaultError::Overflow)?
                    } else {
                        tier.amount
                    };
                    payouts.push(Payout {
                        receiver,
                        amount,
                        tier: Some(tier.name.clone()),
                    });
                }
            }
        }

        let total_paid = UFix64::checked_sum(payouts.iter().map(|p| p.amount))
            .ok_or(PrizeVaultError::Overflow)?;
        let rolled_over = prize_pool.try_sub(total_paid)?;
        Ok(PrizePlan {
            payouts,
            total_paid,
            rolled_over,
        })
    }
}
