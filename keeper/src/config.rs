//! Keeper configuration

use anyhow::{Context, Result};
use prizevault_common::{ReceiverId, UFix64};
use prizevault_engine::{DistributionStrategy, PoolConfig, PrizeDistribution};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Tick interval in seconds
    pub poll_interval_secs: u64,

    /// Receivers finalized per `process_draw_batch` call
    pub batch_size: usize,

    /// Upper bound on phase calls issued in one tick, across all pools
    pub max_actions_per_tick: usize,

    /// Simulated seconds per randomness block
    pub block_time_secs: u64,

    /// Yield injected into every simulated venue each tick
    #[serde(default)]
    pub simulated_yield_per_tick: UFix64,

    /// JSON status snapshot written after each tick
    #[serde(default)]
    pub status_path: Option<String>,

    #[serde(default)]
    pub pools: Vec<PoolSettings>,
}

/// One pool the keeper creates and drives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSettings {
    /// Base seed for the pool's simulated randomness oracle
    pub oracle_seed: u64,

    #[serde(default)]
    pub fee_recipient: Option<String>,

    /// Positions opened when the pool is created
    #[serde(default)]
    pub deposits: Vec<SeedDeposit>,

    pub config: PoolConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedDeposit {
    pub receiver: ReceiverId,
    pub amount: UFix64,
}

impl Config {
    /// Load configuration from TOML file
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("PRIZEVAULT_KEEPER_CONFIG")
            .unwrap_or_else(|_| "keeper-config.toml".to_string());
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &str) -> Result<Self> {
        let expanded = shellexpand::tilde(path);
        let config_str = std::fs::read_to_string(expanded.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path))?;
        Self::parse(&config_str)
    }

    pub fn parse(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str).context("Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.poll_interval_secs > 0, "poll_interval_secs must be positive");
        anyhow::ensure!(self.batch_size > 0, "batch_size must be positive");
        anyhow::ensure!(self.max_actions_per_tick > 0, "max_actions_per_tick must be positive");
        anyhow::ensure!(self.block_time_secs > 0, "block_time_secs must be positive");
        for (i, pool) in self.pools.iter().enumerate() {
            pool.config
                .validate()
                .with_context(|| format!("Invalid config for pool #{}", i))?;
        }
        Ok(())
    }

    /// Single demo pool with two depositors and a 5 minute round
    pub fn default_local() -> Self {
        let distribution = DistributionStrategy::new(
            UFix64::from_raw(50_000_000),
            UFix64::from_raw(40_000_000),
            UFix64::from_raw(10_000_000),
        )
        .unwrap_or_default();
        Self {
            poll_interval_secs: 5,
            batch_size: 100,
            max_actions_per_tick: 16,
            block_time_secs: 2,
            simulated_yield_per_tick: UFix64::from_raw(1_000_000),
            status_path: None,
            pools: vec![PoolSettings {
                oracle_seed: 42,
                fee_recipient: Some("treasury".to_string()),
                deposits: vec![
                    SeedDeposit {
                        receiver: 1,
                        amount: UFix64::from_int(100),
                    },
                    SeedDeposit {
                        receiver: 2,
                        amount: UFix64::from_int(250),
                    },
                ],
                config: PoolConfig::new(
                    "USDC",
                    UFix64::from_int(1),
                    300,
                    distribution,
                    PrizeDistribution::single_winner(),
                ),
            }],
        }
    }

    /// Write default config to file
    pub fn write_default(path: &str) -> Result<()> {
        let config = Self::default_local();
        let toml_str = toml::to_string_pretty(&config).context("Failed to serialize config")?;

        let expanded = shellexpand::tilde(path);
        std::fs::write(expanded.as_ref(), toml_str)
            .with_context(|| format!("Failed to write config to {}", path))?;

        log::info!("Created default config at {}", path);
        Ok(())
    }
}
