//! Pool aggregate: configuration, ledgers, current round and read surface
//!
//! Mutating operations live in `crate::instructions` as further `impl Pool`
//! blocks, one file per concern.

use super::emergency::{EmergencyConfig, EmergencyController, EmergencyInfo, EmergencyState, EmergencyTransition};
use super::receiver::{Receiver, ReceiverInfo};
use super::round::{BatchProgress, DrawPhase, RandomnessMode, Round};
use super::share_vault::ShareVault;
use crate::events::{DrawResult, PoolEvent};
use crate::interfaces::{RandomnessOracle, YieldVenue};
use crate::strategy::{DistributionStrategy, PrizeDistribution};
use prizevault_common::{PoolId, PrizeVaultError, ReceiverId, RoundId, Timestamp, UFix64};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Completed draws kept in memory per pool
pub const MAX_DRAW_HISTORY: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Asset type identifier
    pub asset: String,
    pub minimum_deposit: UFix64,
    pub draw_interval_secs: u64,
    pub distribution: DistributionStrategy,
    #[serde(default)]
    pub prize_distribution: PrizeDistribution,
    #[serde(default)]
    pub randomness_mode: RandomnessMode,
    #[serde(default)]
    pub emergency: EmergencyConfig,
}

impl PoolConfig {
    pub fn new(
        asset: impl Into<String>,
        minimum_deposit: UFix64,
        draw_interval_secs: u64,
        distribution: DistributionStrategy,
        prize_distribution: PrizeDistribution,
    ) -> Self {
        Self {
            asset: asset.into(),
            minimum_deposit,
            draw_interval_secs,
            distribution,
            prize_distribution,
            randomness_mode: RandomnessMode::default(),
            emergency: EmergencyConfig::default(),
        }
    }

    pub fn with_randomness_mode(mut self, mode: RandomnessMode) -> Self {
        self.randomness_mode = mode;
        self
    }

    pub fn with_emergency(mut self, emergency: EmergencyConfig) -> Self {
        self.emergency = emergency;
        self
    }

    pub fn validate(&self) -> Result<(), PrizeVaultError> {
        if self.asset.trim().is_empty() {
            return Err(PrizeVaultError::InvalidConfig("asset must not be empty".into()));
        }
        if self.draw_interval_secs == 0 {
            return Err(PrizeVaultError::InvalidConfig(
                "draw_interval_secs must be positive".into(),
            ));
        }
        self.prize_distribution.validate()?;
        self.emergency.validate()
    }
}

/// Signed difference between the venue balance and allocated funds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "amount", rename_all = "snake_case")]
pub enum PendingYield {
    Balanced,
    Surplus(UFix64),
    /// Not an error: the next sync absorbs it
    Deficit(UFix64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    pub pool_id: PoolId,
    pub asset: String,
    pub phase: DrawPhase,
    pub round_id: Option<RoundId>,
    pub round_start: Option<Timestamp>,
    pub round_target_end: Option<Timestamp>,
    pub emergency_state: EmergencyState,
    pub share_price: UFix64,
    /// Assets owned by depositors (the rewards ledger)
    pub user_pool_balance: UFix64,
    pub total_shares: UFix64,
    pub allocated_prize_yield: UFix64,
    pub allocated_protocol_fee: UFix64,
    pub yield_source_balance: UFix64,
    pub total_rewards_distributed: UFix64,
    pub total_prizes_awarded: UFix64,
    pub total_protocol_fee_forwarded: UFix64,
    pub receiver_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrawStatus {
    pub phase: DrawPhase,
    pub round_id: Option<RoundId>,
    pub is_draw_in_progress: bool,
    pub can_draw_now: bool,
    pub seconds_until_next_draw: u64,
    pub is_batch_complete: bool,
    pub batch: Option<BatchProgress>,
    pub is_randomness_requested: bool,
    pub is_randomness_revealed: bool,
    pub prize_pool_balance: UFix64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtocolFeeStats {
    pub recipient: Option<String>,
    pub has_recipient: bool,
    pub pending: UFix64,
    pub total_forwarded: UFix64,
}

pub struct Pool {
    pub(crate) id: PoolId,
    pub(crate) config: PoolConfig,
    pub(crate) venue: Box<dyn YieldVenue>,
    pub(crate) oracle: Box<dyn RandomnessOracle>,
    pub(crate) vault: ShareVault,
    pub(crate) receivers: BTreeMap<ReceiverId, Receiver>,
    /// `None` between `complete_draw` and `start_next_round`
    pub(crate) round: Option<Round>,
    pub(crate) next_round_id: RoundId,
    pub(crate) emergency: EmergencyController,
    pub(crate) allocated_prize_yield: UFix64,
    pub(crate) allocated_protocol_fee: UFix64,
    pub(crate) protocol_fee_recipient: Option<String>,
    pub(crate) total_rewards_distributed: UFix64,
    pub(crate) total_prizes_awarded: UFix64,
    pub(crate) total_protocol_fee_forwarded: UFix64,
    pub(crate) history: VecDeque<DrawResult>,
    pub(crate) events: Vec<PoolEvent>,
}

impl core::fmt::Debug for Pool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Pool")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("vault", &self.vault)
            .field("round", &self.round.as_ref().map(|r| r.id))
            .field("emergency", &self.emergency.state())
            .finish_non_exhaustive()
    }
}

impl Pool {
    /// Create a pool and open its first round at `now`
    pub fn new(
        id: PoolId,
        config: PoolConfig,
        venue: Box<dyn YieldVenue>,
        oracle: Box<dyn RandomnessOracle>,
        now: Timestamp,
    ) -> Result<Self, PrizeVaultError> {
        config.validate()?;
        let target_end = now
            .checked_add(config.draw_interval_secs)
            .ok_or(PrizeVaultError::Overflow)?;
        let emergency = EmergencyController::new(config.emergency.clone());

        let mut pool = Self {
            id,
            config,
            venue,
            oracle,
            vault: ShareVault::new(),
            receivers: BTreeMap::new(),
            round: Some(Round::new(1, now, target_end, 0)),
            next_round_id: 2,
            emergency,
            allocated_prize_yield: UFix64::ZERO,
            allocated_protocol_fee: UFix64::ZERO,
            protocol_fee_recipient: None,
            total_rewards_distributed: UFix64::ZERO,
            total_prizes_awarded: UFix64::ZERO,
            total_protocol_fee_forwarded: UFix64::ZERO,
            history: VecDeque::with_capacity(MAX_DRAW_HISTORY),
            events: Vec::new(),
        };
        pool.emit(PoolEvent::RoundStarted {
            pool_id: id,
            round_id: 1,
            start_time: now,
            target_end,
        });
        log::info!(
            "pool {} created for {} (round 1 ends at {})",
            id,
            pool.config.asset,
            target_end
        );
        Ok(pool)
    }

    pub fn id(&self) -> PoolId {
        self.id
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Current draw phase
    pub fn state(&self, now: Timestamp) -> DrawPhase {
        self.round
            .as_ref()
            .map(|r| r.phase(now))
            .unwrap_or(DrawPhase::Intermission)
    }

    pub fn current_round_id(&self) -> Option<RoundId> {
        self.round.as_ref().map(|r| r.id)
    }

    pub fn emergency_state(&self) -> EmergencyState {
        self.emergency.state()
    }

    pub fn share_price(&self) -> UFix64 {
        self.vault.share_price()
    }

    pub fn prize_pool_balance(&self) -> UFix64 {
        self.allocated_prize_yield
    }

    pub fn is_registered(&self, receiver: ReceiverId) -> bool {
        self.receivers.contains_key(&receiver)
    }

    pub fn receiver_ids(&self) -> impl Iterator<Item = ReceiverId> + '_ {
        self.receivers.keys().copied()
    }

    pub fn receiver_info(&self, receiver: ReceiverId, now: Timestamp) -> Result<ReceiverInfo, PrizeVaultError> {
        let record = self
            .receivers
            .get(&receiver)
            .ok_or(PrizeVaultError::ReceiverNotFound(receiver))?;
        let shares = self.vault.shares_of(receiver);
        let effective = record.effective_balance(shares);
        let current_weight = self
            .round
            .as_ref()
            .map(|r| r.twab.projected_weight(receiver, effective, now))
            .unwrap_or(0);

        Ok(ReceiverInfo {
            receiver,
            shares,
            balance: self.vault.assets_of(receiver),
            bonus_weight: record.bonus_weight,
            is_sponsor: record.is_sponsor,
            registered_at: record.registered_at,
            lifetime_prizes: record.lifetime_prizes,
            current_weight,
        })
    }

    pub fn batch_progress(&self) -> Option<BatchProgress> {
        self.round
            .as_ref()
            .and_then(|r| r.draw.as_ref())
            .map(|d| d.batch.progress(0))
    }

    pub fn status(&self, now: Timestamp) -> PoolStatus {
        PoolStatus {
            pool_id: self.id,
            asset: self.config.asset.clone(),
            phase: self.state(now),
            round_id: self.current_round_id(),
            round_start: self.round.as_ref().map(|r| r.start_time()),
            round_target_end: self.round.as_ref().map(|r| r.target_end()),
            emergency_state: self.emergency.state(),
            share_price: self.vault.share_price(),
            user_pool_balance: self.vault.total_assets(),
            total_shares: self.vault.total_shares(),
            allocated_prize_yield: self.allocated_prize_yield,
            allocated_protocol_fee: self.allocated_protocol_fee,
            yield_source_balance: self.venue.balance(),
            total_rewards_distributed: self.total_rewards_distributed,
            total_prizes_awarded: self.total_prizes_awarded,
            total_protocol_fee_forwarded: self.total_protocol_fee_forwarded,
            receiver_count: self.receivers.len() as u64,
        }
    }

    pub fn draw_status(&self, now: Timestamp) -> DrawStatus {
        let phase = self.state(now);
        let draw = self.round.as_ref().and_then(|r| r.draw.as_ref());
        let handle = draw.and_then(|d| d.randomness);
        let seconds_until_next_draw = match (&self.round, phase) {
            (Some(round), DrawPhase::RoundActive) => round.target_end().saturating_sub(now),
            _ => 0,
        };

        DrawStatus {
            phase,
            round_id: self.current_round_id(),
            is_draw_in_progress: draw.is_some(),
            can_draw_now: phase == DrawPhase::AwaitingDraw
                && self.emergency.is_allowed(super::emergency::Operation::StartDraw),
            seconds_until_next_draw,
            is_batch_complete: draw.map(|d| d.batch.is_complete()).unwrap_or(false),
            batch: draw.map(|d| d.batch.progress(0)),
            is_randomness_requested: handle.is_some(),
            is_randomness_revealed: handle
                .map(|h| self.oracle.current_height() >= h.reveal_height)
                .unwrap_or(false),
            prize_pool_balance: self.allocated_prize_yield,
        }
    }

    pub fn emergency_info(&self) -> EmergencyInfo {
        self.emergency.info()
    }

    pub fn protocol_fee_stats(&self) -> ProtocolFeeStats {
        ProtocolFeeStats {
            recipient: self.protocol_fee_recipient.clone(),
            has_recipient: self.protocol_fee_recipient.is_some(),
            pending: self.allocated_protocol_fee,
            total_forwarded: self.total_protocol_fee_forwarded,
        }
    }

    /// Completed draws, oldest first
    pub fn draw_history(&self) -> impl Iterator<Item = &DrawResult> {
        self.history.iter()
    }

    pub fn last_draw(&self) -> Option<&DrawResult> {
        self.history.back()
    }

    pub fn drain_events(&mut self) -> Vec<PoolEvent> {
        std::mem::take(&mut self.events)
    }

    // Internal helpers

    pub(crate) fn emit(&mut self, event: PoolEvent) {
        self.events.push(event);
    }

    pub(crate) fn apply_emergency(&mut self, transition: Option<EmergencyTransition>) {
        if let Some(t) = transition {
            self.emit(PoolEvent::EmergencyStateChanged {
                pool_id: self.id,
                from: t.from,
                to: t.to,
                reason: t.reason,
            });
        }
    }

    pub(crate) fn effective_balance(&self, receiver: ReceiverId) -> UFix64 {
        self.receivers
            .get(&receiver)
            .map(|r| r.effective_balance(self.vault.shares_of(receiver)))
            .unwrap_or_default()
    }

    pub(crate) fn total_effective_balance(&self) -> u128 {
        self.receivers
            .keys()
            .map(|id| self.effective_balance(*id).raw() as u128)
            .fold(0u128, |acc, b| acc.saturating_add(b))
    }

    /// Feed an effective-balance change into the current round's TWAB
    pub(crate) fn record_balance_change(&mut self, receiver: ReceiverId, old: UFix64, now: Timestamp) {
        let new = self.effective_balance(receiver);
        if let Some(round) = self.round.as_mut() {
            if old != new {
                round.twab.record_change(receiver, old, new, now);
            }
        }
    }

    /// Funds may move in every phase except `DrawProcessing`
    pub(crate) fn ensure_funds_movable(&self, now: Timestamp) -> Result<(), PrizeVaultError> {
        if self.state(now).allows_fund_movement() {
            Ok(())
        } else {
            Err(PrizeVaultError::DrawInProgress)
        }
    }
}
