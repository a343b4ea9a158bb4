//! Pool event log
//!
//! Every state change appends a [`PoolEvent`]; callers drain the log with
//! `Pool::drain_events` and forward it wherever they record history.

use crate::state::{DrawPhase, EmergencyState};
use crate::strategy::Payout;
use prizevault_common::{PoolId, ReceiverId, RoundId, Timestamp, UFix64, Weight};
use serde::Serialize;

/// Outcome of one completed draw, kept in the pool's bounded history
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrawResult {
    pub round_id: RoundId,
    pub completed_at: Timestamp,
    pub seed: [u8; 32],
    pub participants: u64,
    pub total_weight: Weight,
    pub prize_pool: UFix64,
    pub payouts: Vec<Payout>,
    pub total_paid: UFix64,
    pub rolled_over: UFix64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PoolEvent {
    // --- FUNDS ---
    Deposited {
        pool_id: PoolId,
        receiver: ReceiverId,
        amount: UFix64,
        shares: UFix64,
        sponsor: bool,
    },
    Withdrawn {
        pool_id: PoolId,
        receiver: ReceiverId,
        amount: UFix64,
        shares: UFix64,
    },
    PrizePoolFunded {
        pool_id: PoolId,
        amount: UFix64,
    },

    // --- YIELD ---
    YieldDistributed {
        pool_id: PoolId,
        rewards: UFix64,
        prize: UFix64,
        protocol_fee: UFix64,
    },
    DeficitAbsorbed {
        pool_id: PoolId,
        rewards: UFix64,
        prize: UFix64,
        protocol_fee: UFix64,
    },
    ProtocolFeeForwarded {
        pool_id: PoolId,
        recipient: String,
        amount: UFix64,
    },

    // --- DRAW ---
    DrawStarted {
        pool_id: PoolId,
        round_id: RoundId,
        receivers: u64,
        round_end: Timestamp,
    },
    DrawBatchProcessed {
        pool_id: PoolId,
        round_id: RoundId,
        processed: u64,
        cursor: u64,
        total: u64,
    },
    RandomnessRequested {
        pool_id: PoolId,
        round_id: RoundId,
        request_id: u64,
        reveal_height: u64,
    },
    DrawCompleted {
        pool_id: PoolId,
        result: DrawResult,
    },
    RoundStarted {
        pool_id: PoolId,
        round_id: RoundId,
        start_time: Timestamp,
        target_end: Timestamp,
    },

    // --- ADMIN ---
    EmergencyStateChanged {
        pool_id: PoolId,
        from: EmergencyState,
        to: EmergencyState,
        reason: Option<String>,
    },
    BonusWeightChanged {
        pool_id: PoolId,
        receiver: ReceiverId,
        bonus_weight: UFix64,
        reason: Option<String>,
    },
    ConfigUpdated {
        pool_id: PoolId,
        field: &'static str,
        phase: DrawPhase,
    },
}
