//! Next legal phase call for a pool, derived from its draw status

use prizevault_common::{PrizeVaultError, Timestamp};
use prizevault_engine::{DrawPhase, DrawStatus, Pool};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawAction {
    StartDraw,
    ProcessBatch { limit: usize },
    RequestRandomness,
    CompleteDraw,
    StartNextRound,
}

impl DrawAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DrawAction::StartDraw => "start_draw",
            DrawAction::ProcessBatch { .. } => "process_draw_batch",
            DrawAction::RequestRandomness => "request_draw_randomness",
            DrawAction::CompleteDraw => "complete_draw",
            DrawAction::StartNextRound => "start_next_round",
        }
    }
}

/// `None` when the pool is mid-round, blocked by its emergency state, or
/// waiting for randomness to reveal
pub fn plan_next_action(status: &DrawStatus, batch_size: usize) -> Option<DrawAction> {
    match status.phase {
        DrawPhase::RoundActive => None,
        DrawPhase::AwaitingDraw => status.can_draw_now.then_some(DrawAction::StartDraw),
        DrawPhase::DrawProcessing => {
            if !status.is_batch_complete {
                Some(DrawAction::ProcessBatch { limit: batch_size })
            } else if !status.is_randomness_requested {
                Some(DrawAction::RequestRandomness)
            } else if status.is_randomness_revealed {
                Some(DrawAction::CompleteDraw)
            } else {
                None
            }
        }
        DrawPhase::Intermission => Some(DrawAction::StartNextRound),
    }
}

/// What one executed action achieved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Progressed,
    /// Precondition not met yet; retry on a later tick
    Waiting(String),
}

pub fn execute(pool: &mut Pool, action: DrawAction, now: Timestamp) -> Result<ActionOutcome, PrizeVaultError> {
    let result = match action {
        DrawAction::StartDraw => pool.start_draw(now).map(|_| ()),
        DrawAction::ProcessBatch { limit } => pool.process_draw_batch(limit, now).map(|_| ()),
        DrawAction::RequestRandomness => pool.request_draw_randomness(now).map(|_| ()),
        DrawAction::CompleteDraw => pool.complete_draw(now).map(|_| ()),
        DrawAction::StartNextRound => pool.start_next_round(now).map(|_| ()),
    };
    match result {
        Ok(()) => Ok(ActionOutcome::Progressed),
        Err(PrizeVaultError::NotReady(reason)) => Ok(ActionOutcome::Waiting(reason.to_string())),
        Err(e) => Err(e),
    }
}
