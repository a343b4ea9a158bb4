//! Prize vault integration tests
//!
//! Scenarios drive whole pools through the public engine surface, with the
//! in-memory venue and oracle standing in for the real integrations.

use prizevault_common::{PrizeVaultError, Timestamp, UFix64};
use prizevault_engine::{
    BlockRandomnessOracle, DistributionStrategy, DrawResult, MockYieldVenue, Pool, PoolConfig,
    PrizeDistribution,
};

pub use prizevault_common;
pub use prizevault_engine;

pub fn ufix(s: &str) -> UFix64 {
    s.parse().unwrap_or_else(|e| panic!("bad amount {:?}: {}", s, e))
}

pub fn strategy(rewards: &str, prize: &str, fee: &str) -> DistributionStrategy {
    DistributionStrategy::new(ufix(rewards), ufix(prize), ufix(fee))
        .unwrap_or_else(|e| panic!("bad strategy: {}", e))
}

/// A pool together with handles to its simulated venue and oracle
pub struct TestPool {
    pub pool: Pool,
    pub venue: MockYieldVenue,
    pub oracle: BlockRandomnessOracle,
}

impl TestPool {
    /// Pool created at t=0 with a minimum deposit of 1
    pub fn new(
        interval: u64,
        distribution: DistributionStrategy,
        prize_distribution: PrizeDistribution,
    ) -> Self {
        let config = PoolConfig::new("USDC", ufix("1"), interval, distribution, prize_distribution);
        Self::with_config(config, 11)
    }

    pub fn with_config(config: PoolConfig, seed: u64) -> Self {
        let venue = MockYieldVenue::new();
        let oracle = BlockRandomnessOracle::new(seed);
        let pool = Pool::new(
            1,
            config,
            Box::new(venue.clone()),
            Box::new(oracle.clone()),
            0,
        )
        .unwrap_or_else(|e| panic!("pool creation failed: {}", e));
        Self { pool, venue, oracle }
    }

    /// Run every draw phase at `now`: start, full batch, randomness, reveal, complete
    pub fn run_draw(&mut self, now: Timestamp, batch_size: usize) -> Result<DrawResult, PrizeVaultError> {
        self.pool.start_draw(now)?;
        while !self.pool.process_draw_batch(batch_size, now)?.complete {}
        self.pool.request_draw_randomness(now)?;
        self.oracle.advance_block();
        self.pool.complete_draw(now)
    }
}
