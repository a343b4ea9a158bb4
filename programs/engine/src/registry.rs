//! Pool registry: sole owner of every pool

use crate::interfaces::{RandomnessOracle, YieldVenue};
use crate::state::{Pool, PoolConfig};
use prizevault_common::{PoolId, PrizeVaultError, Timestamp};
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct PoolRegistry {
    pools: BTreeMap<PoolId, Pool>,
    next_id: PoolId,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self {
            pools: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Validate `config`, create the pool and return its id (ids are sequential)
    pub fn create_pool(
        &mut self,
        config: PoolConfig,
        venue: Box<dyn YieldVenue>,
        oracle: Box<dyn RandomnessOracle>,
        now: Timestamp,
    ) -> Result<PoolId, PrizeVaultError> {
        let id = self.next_id.max(1);
        let pool = Pool::new(id, config, venue, oracle, now)?;
        self.pools.insert(id, pool);
        self.next_id = id.saturating_add(1);
        Ok(id)
    }

    pub fn pool(&self, id: PoolId) -> Result<&Pool, PrizeVaultError> {
        self.pools.get(&id).ok_or(PrizeVaultError::PoolNotFound(id))
    }

    pub fn pool_mut(&mut self, id: PoolId) -> Result<&mut Pool, PrizeVaultError> {
        self.pools.get_mut(&id).ok_or(PrizeVaultError::PoolNotFound(id))
    }

    pub fn pool_ids(&self) -> Vec<PoolId> {
        self.pools.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Remove a pool that no longer holds depositor shares
    pub fn remove_pool(&mut self, id: PoolId) -> Result<Pool, PrizeVaultError> {
        let pool = self.pool(id)?;
        if !pool.vault.total_shares().is_zero() {
            return Err(PrizeVaultError::PoolNotEmpty(id));
        }
        self.pools.remove(&id).ok_or(PrizeVaultError::PoolNotFound(id))
    }
}
