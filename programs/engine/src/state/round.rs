//! Round lifecycle data and the resumable draw batch
//!
//! The draw state machine is persisted as plain data: a pool with no round is
//! in intermission, a round with `draw` set is processing a draw, and a round
//! without one is active or awaiting its draw depending on the clock.

use super::twab::TwabTracker;
use crate::interfaces::RandomnessHandle;
use crate::strategy::WeightedEntry;
use prizevault_common::{ReceiverId, RoundId, Timestamp, Weight};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawPhase {
    RoundActive,
    AwaitingDraw,
    DrawProcessing,
    Intermission,
}

impl DrawPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            DrawPhase::RoundActive => "RoundActive",
            DrawPhase::AwaitingDraw => "AwaitingDraw",
            DrawPhase::DrawProcessing => "DrawProcessing",
            DrawPhase::Intermission => "Intermission",
        }
    }

    /// Deposits and withdrawals are blocked only while a draw is processing
    pub fn allows_fund_movement(&self) -> bool {
        !matches!(self, DrawPhase::DrawProcessing)
    }
}

/// When the randomness commitment is issued
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RandomnessMode {
    /// `start_draw` commits immediately
    #[default]
    OnStartDraw,
    /// An explicit `request_draw_randomness` after the batch completes
    AfterBatch,
}

/// Frozen receiver snapshot walked by `process_draw_batch`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawBatch {
    receivers: Vec<ReceiverId>,
    cursor: usize,
    entries: Vec<WeightedEntry>,
    total_weight: Weight,
}

impl DrawBatch {
    pub fn new(receivers: Vec<ReceiverId>) -> Self {
        Self {
            receivers,
            cursor: 0,
            entries: Vec::new(),
            total_weight: 0,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn total(&self) -> usize {
        self.receivers.len()
    }

    pub fn is_complete(&self) -> bool {
        self.cursor >= self.receivers.len()
    }

    /// Next slice of at most `limit` receivers; does not move the cursor
    pub fn next_chunk(&self, limit: usize) -> &[ReceiverId] {
        let end = self.cursor.saturating_add(limit).min(self.receivers.len());
        &self.receivers[self.cursor..end]
    }

    /// Record one finalized weight and advance the cursor past it
    pub fn push_weight(&mut self, receiver: ReceiverId, weight: Weight) {
        if self.is_complete() {
            return;
        }
        if weight > 0 {
            self.entries.push(WeightedEntry { receiver, weight });
            self.total_weight = self.total_weight.saturating_add(weight);
        }
        self.cursor = (self.cursor + 1).min(self.receivers.len());
    }

    pub fn entries(&self) -> &[WeightedEntry] {
        &self.entries
    }

    pub fn total_weight(&self) -> Weight {
        self.total_weight
    }

    pub fn progress(&self, processed: usize) -> BatchProgress {
        let total = self.total() as u64;
        let cursor = self.cursor as u64;
        let percent = if total == 0 {
            100
        } else {
            (cursor * 100 / total) as u8
        };
        BatchProgress {
            cursor,
            total,
            processed: processed as u64,
            percent,
            complete: self.is_complete(),
        }
    }
}

/// Batch progress returned by `process_draw_batch` and the read surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    pub cursor: u64,
    pub total: u64,
    /// Receivers finalized by the call that produced this value
    pub processed: u64,
    pub percent: u8,
    pub complete: bool,
}

/// In-flight draw state, present only in `DrawProcessing`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawProgress {
    pub started_at: Timestamp,
    pub batch: DrawBatch,
    pub randomness: Option<RandomnessHandle>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    pub id: RoundId,
    pub twab: TwabTracker,
    pub draw: Option<DrawProgress>,
}

impl Round {
    pub fn new(id: RoundId, start: Timestamp, target_end: Timestamp, total_balance: u128) -> Self {
        Self {
            id,
            twab: TwabTracker::begin_round(start, target_end, total_balance),
            draw: None,
        }
    }

    pub fn start_time(&self) -> Timestamp {
        self.twab.round_start()
    }

    pub fn target_end(&self) -> Timestamp {
        self.twab.round_end()
    }

    pub fn phase(&self, now: Timestamp) -> DrawPhase {
        if self.draw.is_some() {
            DrawPhase::DrawProcessing
        } else if now >= self.target_end() {
            DrawPhase::AwaitingDraw
        } else {
            DrawPhase::RoundActive
        }
    }
}
