//! Deterministic in-memory venue and oracle
//!
//! Handles are cheap clones sharing one state, so a test (or the keeper's
//! simulation) can keep a handle to inject yield or produce blocks while the
//! pool owns another.

use crate::interfaces::{RandomnessHandle, RandomnessOracle, YieldVenue};
use prizevault_common::{NotReadyReason, PrizeVaultError, UFix64};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct VenueState {
    balance: UFix64,
    liquidity_limit: Option<UFix64>,
    total_deposited: UFix64,
    total_withdrawn: UFix64,
}

#[derive(Debug, Clone, Default)]
pub struct MockYieldVenue {
    inner: Arc<Mutex<VenueState>>,
}

impl MockYieldVenue {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, VenueState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Simulate earned yield
    pub fn inject_yield(&self, amount: UFix64) {
        let mut s = self.state();
        s.balance = s.balance.saturating_add(amount);
    }

    /// Simulate a loss in the venue
    pub fn inject_loss(&self, amount: UFix64) {
        let mut s = self.state();
        s.balance = s.balance.saturating_sub(amount);
    }

    /// Cap how much a single withdrawal can release; `None` removes the cap
    pub fn set_liquidity_limit(&self, limit: Option<UFix64>) {
        self.state().liquidity_limit = limit;
    }

    pub fn total_withdrawn(&self) -> UFix64 {
        self.state().total_withdrawn
    }

    pub fn total_deposited(&self) -> UFix64 {
        self.state().total_deposited
    }
}

impl YieldVenue for MockYieldVenue {
    fn deposit(&mut self, amount: UFix64) -> Result<(), PrizeVaultError> {
        let mut s = self.state();
        s.balance = s.balance.try_add(amount)?;
        s.total_deposited = s.total_deposited.saturating_add(amount);
        Ok(())
    }

    fn withdraw(&mut self, amount: UFix64) -> UFix64 {
        let mut s = self.state();
        let mut released = amount.min(s.balance);
        if let Some(limit) = s.liquidity_limit {
            released = released.min(limit);
        }
        s.balance = s.balance.saturating_sub(released);
        s.total_withdrawn = s.total_withdrawn.saturating_add(released);
        released
    }

    fn balance(&self) -> UFix64 {
        self.state().balance
    }
}

#[derive(Debug)]
struct OracleState {
    base_seed: [u8; 32],
    height: u64,
    next_request: u64,
    reveal_delay: u64,
}

/// Block-based commit/reveal oracle: a commitment made at height `h`
/// reveals once the chain reaches `h + reveal_delay`.
#[derive(Debug, Clone)]
pub struct BlockRandomnessOracle {
    inner: Arc<Mutex<OracleState>>,
}

impl BlockRandomnessOracle {
    pub fn new(seed: u64) -> Self {
        let mut base_seed = [0u8; 32];
        base_seed[..8].copy_from_slice(&seed.to_le_bytes());
        Self {
            inner: Arc::new(Mutex::new(OracleState {
                base_seed,
                height: 0,
                next_request: 1,
                reveal_delay: 1,
            })),
        }
    }

    pub fn with_reveal_delay(self, blocks: u64) -> Self {
        self.state().reveal_delay = blocks.max(1);
        self
    }

    fn state(&self) -> MutexGuard<'_, OracleState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn advance_block(&self) {
        self.advance_blocks(1);
    }

    pub fn advance_blocks(&self, blocks: u64) {
        let mut s = self.state();
        s.height = s.height.saturating_add(blocks);
    }
}

impl RandomnessOracle for BlockRandomnessOracle {
    fn commit(&mut self) -> RandomnessHandle {
        let mut s = self.state();
        let handle = RandomnessHandle {
            request_id: s.next_request,
            reveal_height: s.height.saturating_add(s.reveal_delay),
        };
        s.next_request += 1;
        handle
    }

    fn reveal(&self, handle: &RandomnessHandle) -> Result<[u8; 32], PrizeVaultError> {
        let s = self.state();
        if s.height < handle.reveal_height {
            return Err(PrizeVaultError::NotReady(
                NotReadyReason::RandomnessNotRevealed {
                    reveal_height: handle.reveal_height,
                    current_height: s.height,
                },
            ));
        }
        let mut rng = ChaCha20Rng::from_seed(s.base_seed);
        rng.set_stream(handle.request_id);
        let mut seed = [0u8; 32];
        rng.fill_bytes(&mut seed);
        Ok(seed)
    }

    fn current_height(&self) -> u64 {
        self.state().height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_venue_liquidity_limit() {
        let mut venue = MockYieldVenue::new();
        venue.deposit(UFix64::from_int(100)).unwrap();
        venue.set_liquidity_limit(Some(UFix64::from_int(30)));
        assert_eq!(venue.withdraw(UFix64::from_int(50)), UFix64::from_int(30));
        assert_eq!(venue.balance(), UFix64::from_int(70));

        let observer = venue.clone();
        observer.inject_yield(UFix64::from_int(5));
        assert_eq!(venue.balance(), UFix64::from_int(75));
    }

    #[test]
    fn test_oracle_reveal_after_block() {
        let mut oracle = BlockRandomnessOracle::new(7);
        let handle = oracle.commit();
        assert!(matches!(
            oracle.reveal(&handle),
            Err(PrizeVaultError::NotReady(_))
        ));
        oracle.advance_block();
        let seed = oracle.reveal(&handle).unwrap();
        assert_eq!(oracle.reveal(&handle).unwrap(), seed);

        let other = oracle.commit();
        oracle.advance_block();
        assert_ne!(oracle.reveal(&other).unwrap(), seed);
    }
}
