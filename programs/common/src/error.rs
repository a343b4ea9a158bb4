//! Error taxonomy for every pool operation
//!
//! Each variant belongs to one [`ErrorKind`]. Operations that fail leave the
//! pool's financial state untouched, so callers can retry `NotReady` errors
//! and treat the rest as rejections.

use crate::math::UFix64;
use crate::types::{PoolId, ReceiverId};
use serde::Serialize;

/// Coarse error class used by callers (and the keeper) to decide what to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad configuration or arguments, rejected before any state change
    Validation,
    /// Operation attempted in the wrong draw phase or emergency state
    StateViolation,
    /// Withdrawal exceeds the position, or the venue could not release funds
    InsufficientFunds,
    /// Precondition not met yet; retry later
    NotReady,
    /// Unknown pool or receiver
    NotFound,
    /// Fixed-point overflow
    Arithmetic,
}

/// Why a draw step cannot run yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotReadyReason {
    /// Batch cursor has not reached the end of the receiver snapshot
    BatchIncomplete { cursor: u64, total: u64 },
    /// No randomness commitment exists for this draw
    RandomnessNotRequested,
    /// Commitment exists but the reveal height has not been produced
    RandomnessNotRevealed { reveal_height: u64, current_height: u64 },
}

impl core::fmt::Display for NotReadyReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            NotReadyReason::BatchIncomplete { cursor, total } => {
                write!(f, "draw batch incomplete ({}/{})", cursor, total)
            }
            NotReadyReason::RandomnessNotRequested => write!(f, "randomness not requested"),
            NotReadyReason::RandomnessNotRevealed {
                reveal_height,
                current_height,
            } => write!(
                f,
                "randomness reveals at height {} (current {})",
                reveal_height, current_height
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrizeVaultError {
    // Validation
    #[error("invalid distribution: {0}")]
    InvalidDistribution(String),

    #[error("invalid prize distribution: {0}")]
    InvalidPrizeDistribution(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("deposit of {amount} is below the minimum deposit of {minimum}")]
    BelowMinimumDeposit { amount: UFix64, minimum: UFix64 },

    #[error("receiver {0} is registered with a different role")]
    ReceiverRoleMismatch(ReceiverId),

    // State violations
    #[error("draw cannot start while pool is in phase {phase}")]
    AlreadyInProgress { phase: &'static str },

    #[error("funds cannot move while a draw is processing")]
    DrawInProgress,

    #[error("operation requires phase {expected}, pool is in phase {actual}")]
    WrongPhase {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("operation {operation} is not allowed in emergency state {state}")]
    EmergencyStateViolation {
        state: &'static str,
        operation: &'static str,
    },

    #[error("deposit of {amount} exceeds the partial-mode limit of {limit}")]
    DepositLimitExceeded { amount: UFix64, limit: UFix64 },

    #[error("no protocol fee recipient configured")]
    NoFeeRecipient,

    #[error("pool {0} still holds deposits")]
    PoolNotEmpty(PoolId),

    // Insufficient funds
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        requested: UFix64,
        available: UFix64,
    },

    #[error("yield venue released {released} of {requested}")]
    VenueShortfall { requested: UFix64, released: UFix64 },

    // Not ready
    #[error("not ready: {0}")]
    NotReady(NotReadyReason),

    // Lookups
    #[error("pool {0} not found")]
    PoolNotFound(PoolId),

    #[error("receiver {0} not found")]
    ReceiverNotFound(ReceiverId),

    // Arithmetic
    #[error("arithmetic overflow")]
    Overflow,
}

impl PrizeVaultError {
    /// Map the error onto the caller-facing taxonomy
    pub fn kind(&self) -> ErrorKind {
        use PrizeVaultError::*;
        match self {
            InvalidDistribution(_)
            | InvalidPrizeDistribution(_)
            | InvalidConfig(_)
            | InvalidAmount(_)
            | BelowMinimumDeposit { .. }
            | ReceiverRoleMismatch(_) => ErrorKind::Validation,
            AlreadyInProgress { .. }
            | DrawInProgress
            | WrongPhase { .. }
            | EmergencyStateViolation { .. }
            | DepositLimitExceeded { .. }
            | NoFeeRecipient
            | PoolNotEmpty(_) => ErrorKind::StateViolation,
            InsufficientBalance { .. } | VenueShortfall { .. } => ErrorKind::InsufficientFunds,
            NotReady(_) => ErrorKind::NotReady,
            PoolNotFound(_) | ReceiverNotFound(_) => ErrorKind::NotFound,
            Overflow => ErrorKind::Arithmetic,
        }
    }

    /// True when the caller should simply try again later
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::NotReady
    }
}
