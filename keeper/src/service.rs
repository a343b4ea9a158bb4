//! Keeper service: owns the pools, simulates their venues and oracles, and
//! drives every pool through its draw phases on schedule.

use crate::config::Config;
use crate::planner::{self, ActionOutcome, DrawAction};
use crate::priority_queue::DrawQueue;
use crate::status;
use anyhow::{Context, Result};
use prizevault_common::{PoolId, Timestamp, UFix64};
use prizevault_engine::{BlockRandomnessOracle, DrawPhase, MockYieldVenue, PoolRegistry};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time;

/// Handles to the simulated venue and oracle behind one pool
struct SimulatedBackends {
    venue: MockYieldVenue,
    oracle: BlockRandomnessOracle,
}

/// Summary of one tick
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub actions: usize,
    pub draws_completed: usize,
    pub waiting: usize,
    pub failures: usize,
}

pub struct Keeper {
    registry: PoolRegistry,
    queue: DrawQueue,
    backends: BTreeMap<PoolId, SimulatedBackends>,
    batch_size: usize,
    max_actions_per_tick: usize,
    retry_secs: u64,
    block_time_secs: u64,
    yield_per_tick: UFix64,
    last_block_at: Timestamp,
}

/// Waits logged before a stalled draw is reported as a warning
const STALL_WARN_WAITS: u32 = 10;

impl Keeper {
    /// Create every configured pool at `now` and open its seed positions
    pub fn from_config(config: &Config, now: Timestamp) -> Result<Self> {
        config.validate()?;
        let mut keeper = Self {
            registry: PoolRegistry::new(),
            queue: DrawQueue::new(),
            backends: BTreeMap::new(),
            batch_size: config.batch_size,
            max_actions_per_tick: config.max_actions_per_tick,
            retry_secs: config.poll_interval_secs,
            block_time_secs: config.block_time_secs,
            yield_per_tick: config.simulated_yield_per_tick,
            last_block_at: now,
        };

        for settings in &config.pools {
            let venue = MockYieldVenue::new();
            let oracle = BlockRandomnessOracle::new(settings.oracle_seed);
            let id = keeper
                .registry
                .create_pool(
                    settings.config.clone(),
                    Box::new(venue.clone()),
                    Box::new(oracle.clone()),
                    now,
                )
                .context("Failed to create pool")?;
            let pool = keeper.registry.pool_mut(id)?;

            if let Some(recipient) = &settings.fee_recipient {
                pool.set_protocol_fee_recipient(recipient.clone(), now)?;
            }
            for deposit in &settings.deposits {
                pool.deposit(deposit.receiver, deposit.amount, now)
                    .with_context(|| format!("Seed deposit for receiver {} failed", deposit.receiver))?;
            }

            let due = now.saturating_add(pool.draw_status(now).seconds_until_next_draw);
            keeper.queue.schedule(id, due);
            keeper.backends.insert(id, SimulatedBackends { venue, oracle });
            log::info!("Pool {} ({}) scheduled, first draw due at {}", id, settings.config.asset, due);
        }
        Ok(keeper)
    }

    pub fn registry(&self) -> &PoolRegistry {
        &self.registry
    }

    pub fn queue(&self) -> &DrawQueue {
        &self.queue
    }

    /// Advance the simulated chain: mint blocks for elapsed time and accrue yield
    pub fn simulate(&mut self, now: Timestamp) {
        let blocks = now.saturating_sub(self.last_block_at) / self.block_time_secs;
        if blocks > 0 {
            self.last_block_at = self
                .last_block_at
                .saturating_add(blocks.saturating_mul(self.block_time_secs));
        }
        for backend in self.backends.values() {
            if blocks > 0 {
                backend.oracle.advance_blocks(blocks);
            }
            if !self.yield_per_tick.is_zero() {
                backend.venue.inject_yield(self.yield_per_tick);
            }
        }
    }

    /// Run due pools through as many phase calls as the tick budget allows
    pub fn tick(&mut self, now: Timestamp) -> TickReport {
        let mut report = TickReport::default();

        while report.actions < self.max_actions_per_tick {
            let Some(mut entry) = self.queue.pop_due(now) else {
                break;
            };
            let pool_id = entry.pool_id;
            let Ok(pool) = self.registry.pool_mut(pool_id) else {
                log::warn!("Pool {} no longer exists, dropping it", pool_id);
                continue;
            };

            let mut progressed = false;
            let mut blocked = false;
            while report.actions < self.max_actions_per_tick {
                let status = pool.draw_status(now);
                let Some(action) = planner::plan_next_action(&status, self.batch_size) else {
                    break;
                };
                report.actions += 1;
                match planner::execute(pool, action, now) {
                    Ok(ActionOutcome::Progressed) => {
                        progressed = true;
                        if action == DrawAction::CompleteDraw {
                            report.draws_completed += 1;
                        }
                        log::debug!("Pool {}: {} ok", pool_id, action.as_str());
                    }
                    Ok(ActionOutcome::Waiting(reason)) => {
                        report.waiting += 1;
                        blocked = true;
                        log::debug!("Pool {}: {} not ready ({})", pool_id, action.as_str(), reason);
                        break;
                    }
                    Err(e) => {
                        report.failures += 1;
                        blocked = true;
                        log::error!("Pool {}: {} failed: {}", pool_id, action.as_str(), e);
                        break;
                    }
                }
            }

            for event in pool.drain_events() {
                match serde_json::to_string(&event) {
                    Ok(json) => log::debug!("Pool {} event: {}", pool_id, json),
                    Err(e) => log::warn!("Pool {}: failed to encode event: {}", pool_id, e),
                }
            }

            let status = pool.draw_status(now);
            entry.due_at = match status.phase {
                DrawPhase::RoundActive => now.saturating_add(status.seconds_until_next_draw),
                _ => now.saturating_add(self.retry_secs),
            };
            if progressed {
                entry.waits = 0;
            } else if blocked || status.phase != DrawPhase::RoundActive {
                entry.waits = entry.waits.saturating_add(1);
                if entry.waits == STALL_WARN_WAITS {
                    log::warn!(
                        "Pool {} has not progressed for {} ticks (phase {})",
                        pool_id,
                        entry.waits,
                        status.phase.as_str()
                    );
                }
            }
            self.queue.push(entry);
        }

        let backlog = self.queue.overdue(now).len();
        if backlog > 0 {
            log::debug!("{} pool(s) still due after spending the tick budget", backlog);
        }
        report
    }
}

/// Tick loop; stops after `max_ticks` ticks when given, otherwise runs forever
pub async fn run<C>(
    keeper: &mut Keeper,
    period: Duration,
    mut clock: C,
    status_path: Option<&str>,
    max_ticks: Option<u64>,
) -> Result<()>
where
    C: FnMut() -> Timestamp,
{
    let mut interval = time::interval(period);
    let mut ticks = 0u64;

    loop {
        interval.tick().await;
        let now = clock();
        keeper.simulate(now);
        let report = keeper.tick(now);
        if report.actions > 0 {
            log::info!(
                "Tick at {}: {} action(s), {} draw(s) completed, {} waiting, {} failed",
                now,
                report.actions,
                report.draws_completed,
                report.waiting,
                report.failures
            );
        }

        if let Some(path) = status_path {
            let snapshot = status::snapshot(keeper.registry(), now);
            if let Err(e) = status::write_snapshot(path, &snapshot) {
                log::error!("Error writing status: {:#}", e);
            }
        }

        ticks += 1;
        if max_ticks.is_some_and(|max| ticks >= max) {
            return Ok(());
        }
    }
}
