//! Priority queue of pools ordered by their next action deadline (earliest first)

use prizevault_common::{PoolId, Timestamp};
use priority_queue::PriorityQueue;
use std::cmp::Reverse;
use std::collections::HashMap;

/// When the keeper should next look at a pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledPool {
    pub pool_id: PoolId,
    /// Earliest time the next phase call can make progress
    pub due_at: Timestamp,
    /// Consecutive ticks the pool was due but could not progress
    pub waits: u32,
}

/// Deadline-based priority queue (min-heap: earliest deadline first)
pub struct DrawQueue {
    /// Priority queue (using Reverse for min-heap)
    queue: PriorityQueue<PoolId, Reverse<Timestamp>>,
    /// Map for O(1) lookups
    map: HashMap<PoolId, ScheduledPool>,
}

impl DrawQueue {
    pub fn new() -> Self {
        Self {
            queue: PriorityQueue::new(),
            map: HashMap::new(),
        }
    }

    /// Insert or move a pool's deadline
    pub fn schedule(&mut self, pool_id: PoolId, due_at: Timestamp) {
        let waits = self.map.get(&pool_id).map(|s| s.waits).unwrap_or(0);
        self.push(ScheduledPool {
            pool_id,
            due_at,
            waits,
        });
    }

    pub fn push(&mut self, entry: ScheduledPool) {
        let pool_id = entry.pool_id;
        let due_at = entry.due_at;
        self.map.insert(pool_id, entry);
        self.queue.push(pool_id, Reverse(due_at));
    }

    /// Pop the earliest pool if its deadline has passed
    pub fn pop_due(&mut self, now: Timestamp) -> Option<ScheduledPool> {
        let (_, Reverse(due_at)) = self.queue.peek()?;
        if *due_at > now {
            return None;
        }
        let (pool_id, _) = self.queue.pop()?;
        self.map.remove(&pool_id)
    }

    /// Earliest scheduled pool without removing it
    pub fn peek(&self) -> Option<&ScheduledPool> {
        let (pool_id, _) = self.queue.peek()?;
        self.map.get(pool_id)
    }

    pub fn remove(&mut self, pool_id: &PoolId) -> Option<ScheduledPool> {
        self.queue.remove(pool_id);
        self.map.remove(pool_id)
    }

    pub fn get(&self, pool_id: &PoolId) -> Option<&ScheduledPool> {
        self.map.get(pool_id)
    }

    pub fn contains(&self, pool_id: &PoolId) -> bool {
        self.map.contains_key(pool_id)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Pools whose deadline has passed, earliest first
    pub fn overdue(&self, now: Timestamp) -> Vec<ScheduledPool> {
        let mut due: Vec<_> = self
            .map
            .values()
            .filter(|s| s.due_at <= now)
            .cloned()
            .collect();
        due.sort_by_key(|s| (s.due_at, s.pool_id));
        due
    }
}

impl Default for DrawQueue {
    fn default() -> Self {
        Self::new()
    }
}
