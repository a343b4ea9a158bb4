//! External resources a pool depends on
//!
//! Both are narrow traits injected at pool construction. Deterministic
//! in-memory implementations live in [`crate::mocks`].

use prizevault_common::{PrizeVaultError, UFix64};
use serde::{Deserialize, Serialize};

/// Where pooled funds earn yield
pub trait YieldVenue: Send {
    fn deposit(&mut self, amount: UFix64) -> Result<(), PrizeVaultError>;

    /// Release up to `amount`; returns what was actually released
    fn withdraw(&mut self, amount: UFix64) -> UFix64;

    fn balance(&self) -> UFix64;
}

/// Commitment to randomness that becomes available at a future height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RandomnessHandle {
    pub request_id: u64,
    pub reveal_height: u64,
}

/// Commit/reveal randomness source
pub trait RandomnessOracle: Send {
    /// Commit to a seed bound to a future block
    fn commit(&mut self) -> RandomnessHandle;

    /// The committed seed, or `NotReady` until the reveal height is reached
    fn reveal(&self, handle: &RandomnessHandle) -> Result<[u8; 32], PrizeVaultError>;

    fn current_height(&self) -> u64;
}
