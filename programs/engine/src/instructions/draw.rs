//! Draw state machine
//!
//! `RoundActive -> AwaitingDraw -> DrawProcessing -> Intermission -> RoundActive`
//!
//! Each step is a separate call that re-validates its precondition from the
//! persisted round data, so an external trigger can call them in any order
//! and simply retry on `NotReady`. A stalled draw stays in `DrawProcessing`
//! until someone resumes it.

use crate::events::{DrawResult, PoolEvent};
use crate::interfaces::RandomnessHandle;
use crate::invariants;
use crate::state::{
    BatchProgress, DrawBatch, DrawPhase, DrawProgress, Operation, Pool, RandomnessMode, Round,
    MAX_DRAW_HISTORY,
};
use crate::strategy::select_weighted_winners;
use prizevault_common::{NotReadyReason, PrizeVaultError, Timestamp};

impl Pool {
    fn wrong_phase(expected: DrawPhase, actual: DrawPhase) -> PrizeVaultError {
        PrizeVaultError::WrongPhase {
            expected: expected.as_str(),
            actual: actual.as_str(),
        }
    }

    /// Freeze the round and open a batch over every registered receiver
    pub fn start_draw(&mut self, now: Timestamp) -> Result<BatchProgress, PrizeVaultError> {
        let phase = self.state(now);
        if phase != DrawPhase::AwaitingDraw {
            return Err(PrizeVaultError::AlreadyInProgress {
                phase: phase.as_str(),
            });
        }
        self.emergency.check(Operation::StartDraw)?;
        self.sync_with_yield_source(now)?;
        self.emergency.check(Operation::StartDraw)?;

        let receivers: Vec<_> = self.receivers.keys().copied().collect();
        let randomness = match self.config.randomness_mode {
            RandomnessMode::OnStartDraw => Some(self.oracle.commit()),
            RandomnessMode::AfterBatch => None,
        };

        let pool_id = self.id;
        let round = self.round.as_mut().ok_or(PrizeVaultError::AlreadyInProgress {
            phase: DrawPhase::Intermission.as_str(),
        })?;
        let batch = DrawBatch::new(receivers);
        let progress = batch.progress(0);
        round.draw = Some(DrawProgress {
            started_at: now,
            batch,
            randomness,
        });
        let round_id = round.id;
        let round_end = round.target_end();

        self.emit(PoolEvent::DrawStarted {
            pool_id,
            round_id,
            receivers: progress.total,
            round_end,
        });
        if let Some(handle) = randomness {
            self.emit(PoolEvent::RandomnessRequested {
                pool_id,
                round_id,
                request_id: handle.request_id,
                reveal_height: handle.reveal_height,
            });
        }
        log::info!(
            "pool {}: draw started for round {} over {} receivers",
            pool_id,
            round_id,
            progress.total
        );
        Ok(progress)
    }

    /// Finalize TWAB weights for up to `limit` receivers
    ///
    /// Once the batch is complete further calls return the final progress
    /// with `processed == 0`.
    pub fn process_draw_batch(&mut self, limit: usize, now: Timestamp) -> Result<BatchProgress, PrizeVaultError> {
        if limit == 0 {
            return Err(PrizeVaultError::InvalidAmount("batch limit must be positive".into()));
        }
        let phase = self.state(now);
        if phase != DrawPhase::DrawProcessing {
            return Err(Self::wrong_phase(DrawPhase::DrawProcessing, phase));
        }
        self.emergency.check(Operation::ProcessBatch)?;

        let chunk: Vec<_> = match self.round.as_ref().and_then(|r| r.draw.as_ref()) {
            Some(draw) => draw.batch.next_chunk(limit).to_vec(),
            None => return Err(Self::wrong_phase(DrawPhase::DrawProcessing, phase)),
        };
        let balances: Vec<_> = chunk
            .iter()
            .map(|id| (*id, self.effective_balance(*id)))
            .collect();

        let pool_id = self.id;
        let (round_id, progress) = match self.round.as_mut() {
            Some(Round {
                id,
                twab,
                draw: Some(draw),
            }) => {
                for (receiver, balance) in balances {
                    let weight = twab.finalize(receiver, balance);
                    draw.batch.push_weight(receiver, weight);
                }
                (*id, draw.batch.progress(chunk.len()))
            }
            _ => return Err(Self::wrong_phase(DrawPhase::DrawProcessing, phase)),
        };

        if progress.processed > 0 {
            self.emit(PoolEvent::DrawBatchProcessed {
                pool_id,
                round_id,
                processed: progress.processed,
                cursor: progress.cursor,
                total: progress.total,
            });
            log::debug!(
                "pool {}: batch {}/{} ({}%)",
                pool_id,
                progress.cursor,
                progress.total,
                progress.percent
            );
        }
        Ok(progress)
    }

    /// Commit to randomness once the batch is complete
    ///
    /// Returns the existing handle if one was already issued.
    pub fn request_draw_randomness(&mut self, now: Timestamp) -> Result<RandomnessHandle, PrizeVaultError> {
        let phase = self.state(now);
        if phase != DrawPhase::DrawProcessing {
            return Err(Self::wrong_phase(DrawPhase::DrawProcessing, phase));
        }
        self.emergency.check(Operation::RequestRandomness)?;

        let pool_id = self.id;
        let oracle = &mut self.oracle;
        let (round_id, handle) = match self.round.as_mut() {
            Some(Round {
                id,
                draw: Some(draw),
                ..
            }) => {
                if !draw.batch.is_complete() {
                    return Err(PrizeVaultError::NotReady(NotReadyReason::BatchIncomplete {
                        cursor: draw.batch.cursor() as u64,
                        total: draw.batch.total() as u64,
                    }));
                }
                if let Some(handle) = draw.randomness {
                    return Ok(handle);
                }
                let handle = oracle.commit();
                draw.randomness = Some(handle);
                (*id, handle)
            }
            _ => return Err(Self::wrong_phase(DrawPhase::DrawProcessing, phase)),
        };

        self.emit(PoolEvent::RandomnessRequested {
            pool_id,
            round_id,
            request_id: handle.request_id,
            reveal_height: handle.reveal_height,
        });
        log::info!(
            "pool {}: randomness requested for round {} (reveals at height {})",
            pool_id,
            round_id,
            handle.reveal_height
        );
        Ok(handle)
    }

    /// Select winners, pay prizes, forward the fee and close the round
    pub fn complete_draw(&mut self, now: Timestamp) -> Result<DrawResult, PrizeVaultError> {
        let phase = self.state(now);
        if phase != DrawPhase::DrawProcessing {
            return Err(Self::wrong_phase(DrawPhase::DrawProcessing, phase));
        }
        self.emergency.check(Operation::CompleteDraw)?;

        // Every precondition is checked before anything mutates
        let (round_id, handle) = match self.round.as_ref() {
            Some(Round {
                id,
                draw: Some(draw),
                ..
            }) => {
                if !draw.batch.is_complete() {
                    return Err(PrizeVaultError::NotReady(NotReadyReason::BatchIncomplete {
                        cursor: draw.batch.cursor() as u64,
                        total: draw.batch.total() as u64,
                    }));
                }
                match draw.randomness {
                    Some(handle) => (*id, handle),
                    None => {
                        return Err(PrizeVaultError::NotReady(
                            NotReadyReason::RandomnessNotRequested,
                        ))
                    }
                }
            }
            _ => return Err(Self::wrong_phase(DrawPhase::DrawProcessing, phase)),
        };
        let seed = self.oracle.reveal(&handle)?;

        self.sync_with_yield_source(now)?;
        self.emergency.check(Operation::CompleteDraw)?;

        let (entries, total_weight) = match self.round.as_ref().and_then(|r| r.draw.as_ref()) {
            Some(draw) => (draw.batch.entries().to_vec(), draw.batch.total_weight()),
            None => return Err(Self::wrong_phase(DrawPhase::DrawProcessing, phase)),
        };

        let prize_pool = self.allocated_prize_yield;
        let distribution = &self.config.prize_distribution;
        let winners = if prize_pool.is_zero() || total_weight == 0 {
            Default::default()
        } else {
            select_weighted_winners(&entries, distribution.winner_count(), &seed)
        };
        let mut plan = distribution.distribute(prize_pool, &winners)?;

        // Prizes compound into the winners' positions; apply on a copy so a
        // failure part way leaves the pool untouched
        let mut vault = self.vault.clone();
        let mut lifetime = Vec::with_capacity(plan.payouts.len());
        let mut unminted = Vec::new();
        for payout in &plan.payouts {
            if payout.amount.is_zero() {
                continue;
            }
            // A payout worth less than one share stays in the prize pool
            match vault.preview_deposit(payout.amount) {
                Ok(shares) if !shares.is_zero() => {}
                _ => {
                    log::debug!(
                        "pool {}: prize {} for receiver {} mints no shares, rolling it over",
                        self.id,
                        payout.amount,
                        payout.receiver
                    );
                    unminted.push(payout.receiver);
                    continue;
                }
            }
            vault.deposit(payout.receiver, payout.amount)?;
            let prior = self
                .receivers
                .get(&payout.receiver)
                .map(|r| r.lifetime_prizes)
                .ok_or(PrizeVaultError::ReceiverNotFound(payout.receiver))?;
            lifetime.push((payout.receiver, prior.try_add(payout.amount)?));
        }
        plan.roll_back(&unminted)?;
        debug_assert!(invariants::prize_plan_conserved(&plan, prize_pool));
        let total_prizes = self.total_prizes_awarded.try_add(plan.total_paid)?;

        self.vault = vault;
        self.allocated_prize_yield = plan.rolled_over;
        self.total_prizes_awarded = total_prizes;
        for (receiver, total) in lifetime {
            if let Some(r) = self.receivers.get_mut(&receiver) {
                r.lifetime_prizes = total;
            }
        }

        if self.emergency.is_allowed(Operation::ForwardFee) {
            self.forward_fee_best_effort();
        }
        debug_assert!(invariants::allocations_covered(self));

        let result = DrawResult {
            round_id,
            completed_at: now,
            seed,
            participants: entries.len() as u64,
            total_weight,
            prize_pool,
            payouts: plan.payouts.to_vec(),
            total_paid: plan.total_paid,
            rolled_over: plan.rolled_over,
        };
        if self.history.len() >= MAX_DRAW_HISTORY {
            self.history.pop_front();
        }
        self.history.push_back(result.clone());
        self.round = None;

        self.emit(PoolEvent::DrawCompleted {
            pool_id: self.id,
            result: result.clone(),
        });
        log::info!(
            "pool {}: round {} complete, {} winner(s) paid {} ({} rolled over)",
            self.id,
            round_id,
            result.payouts.len(),
            result.total_paid,
            result.rolled_over
        );
        Ok(result)
    }

    /// Open the next round: starts now and ends one draw interval later
    pub fn start_next_round(&mut self, now: Timestamp) -> Result<Timestamp, PrizeVaultError> {
        let phase = self.state(now);
        if phase != DrawPhase::Intermission {
            return Err(Self::wrong_phase(DrawPhase::Intermission, phase));
        }
        self.emergency.check(Operation::StartNextRound)?;

        let target_end = now
            .checked_add(self.config.draw_interval_secs)
            .ok_or(PrizeVaultError::Overflow)?;
        let round_id = self.next_round_id;
        self.round = Some(Round::new(
            round_id,
            now,
            target_end,
            self.total_effective_balance(),
        ));
        self.next_round_id = round_id.saturating_add(1);

        self.emit(PoolEvent::RoundStarted {
            pool_id: self.id,
            round_id,
            start_time: now,
            target_end,
        });
        log::info!(
            "pool {}: round {} started, ends at {}",
            self.id,
            round_id,
            target_end
        );
        Ok(target_end)
    }
}
