//! Time-weighted average balance accounting for one round
//!
//! Weight is balance-seconds: every balance change first accrues
//! `balance * (t - last_checkpoint)` and then moves the checkpoint to `t`.
//! Times are clamped to `[round_start, round_end]`, so activity after the
//! round ended contributes nothing and a receiver that joins mid-round is
//! weighted only for the time it was in.
//!
//! Receivers that never change balance during a round have no entry at all
//! (lazy users); their weight is `balance * round_duration`, computed when
//! the round is finalized. A pool-wide accumulator follows the same rule so
//! the sum of finalized receiver weights equals [`TwabTracker::pool_weight`].

use prizevault_common::{ReceiverId, Timestamp, UFix64, Weight};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TwabEntry {
    accumulated: Weight,
    balance: UFix64,
    last_checkpoint: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwabTracker {
    round_start: Timestamp,
    round_end: Timestamp,
    entries: BTreeMap<ReceiverId, TwabEntry>,
    finalized: BTreeMap<ReceiverId, Weight>,
    pool_accumulated: Weight,
    pool_balance: u128,
    pool_checkpoint: Timestamp,
}

impl TwabTracker {
    /// Open a round; `total_balance` is the sum of effective balances at `start`
    pub fn begin_round(start: Timestamp, end: Timestamp, total_balance: u128) -> Self {
        Self {
            round_start: start,
            round_end: end.max(start),
            entries: BTreeMap::new(),
            finalized: BTreeMap::new(),
            pool_accumulated: 0,
            pool_balance: total_balance,
            pool_checkpoint: start,
        }
    }

    pub fn round_start(&self) -> Timestamp {
        self.round_start
    }

    pub fn round_end(&self) -> Timestamp {
        self.round_end
    }

    /// Move the round end; checkpoints already recorded are kept
    pub fn set_round_end(&mut self, end: Timestamp) {
        self.round_end = end.max(self.round_start);
    }

    fn clamp(&self, t: Timestamp) -> Timestamp {
        t.clamp(self.round_start, self.round_end)
    }

    fn span(balance: UFix64, from: Timestamp, to: Timestamp) -> Weight {
        balance.to_weight(to.saturating_sub(from))
    }

    /// Record an effective-balance change from `old` to `new` at `now`
    pub fn record_change(
        &mut self,
        receiver: ReceiverId,
        old: UFix64,
        new: UFix64,
        now: Timestamp,
    ) {
        let t = self.clamp(now);
        let start = self.round_start;

        let entry = self.entries.entry(receiver).or_insert(TwabEntry {
            accumulated: 0,
            balance: old,
            last_checkpoint: start,
        });
        let elapsed = Self::span(entry.balance, entry.last_checkpoint, t);
        entry.accumulated = entry.accumulated.saturating_add(elapsed);
        entry.last_checkpoint = t;
        entry.balance = new;

        let pool_elapsed = self
            .pool_balance
            .saturating_mul(t.saturating_sub(self.pool_checkpoint) as u128);
        self.pool_accumulated = self.pool_accumulated.saturating_add(pool_elapsed);
        self.pool_checkpoint = t;
        self.pool_balance = self
            .pool_balance
            .saturating_sub(old.raw() as u128)
            .saturating_add(new.raw() as u128);
    }

    /// Close the receiver's weight at the round end
    ///
    /// `balance` is the receiver's current effective balance and is only read
    /// for lazy receivers. Repeated calls return the first result.
    pub fn finalize(&mut self, receiver: ReceiverId, balance: UFix64) -> Weight {
        if let Some(&weight) = self.finalized.get(&receiver) {
            return weight;
        }
        let weight = self.weight_until(receiver, balance, self.round_end);
        self.finalized.insert(receiver, weight);
        weight
    }

    pub fn is_finalized(&self, receiver: ReceiverId) -> bool {
        self.finalized.contains_key(&receiver)
    }

    /// Weight accrued so far (up to `min(now, round_end)`) without finalizing
    pub fn projected_weight(&self, receiver: ReceiverId, balance: UFix64, now: Timestamp) -> Weight {
        if let Some(&weight) = self.finalized.get(&receiver) {
            return weight;
        }
        self.weight_until(receiver, balance, self.clamp(now))
    }

    fn weight_until(&self, receiver: ReceiverId, balance: UFix64, t: Timestamp) -> Weight {
        match self.entries.get(&receiver) {
            Some(e) => e
                .accumulated
                .saturating_add(Self::span(e.balance, e.last_checkpoint, t.max(e.last_checkpoint))),
            None => Self::span(balance, self.round_start, t),
        }
    }

    /// Pool-wide weight over the full round
    pub fn pool_weight(&self) -> Weight {
        let remaining = self.round_end.saturating_sub(self.pool_checkpoint) as u128;
        self.pool_accumulated
            .saturating_add(self.pool_balance.saturating_mul(remaining))
    }
}
