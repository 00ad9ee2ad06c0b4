//! Periodic ticks and their ordering.

use std::cmp::Ordering;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Priority of ticks scheduled at the same instant.
///
/// Lower numeric values run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventPriority {
    High = 0,
    Normal = 1,
}

/// Kind of periodic tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TickKind {
    /// One exchange round, settled if it changed anything
    Exchange,
    /// One link-cost change followed by a forced round and reconvergence
    Mutation,
}

impl TickKind {
    /// Exchange ticks win ties against mutation ticks.
    pub fn priority(self) -> EventPriority {
        match self {
            TickKind::Exchange => EventPriority::High,
            TickKind::Mutation => EventPriority::Normal,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TickKind::Exchange => "exchange",
            TickKind::Mutation => "mutation",
        }
    }
}

/// Tick waiting in the event queue.
#[derive(Debug, Clone, Copy)]
pub struct ScheduledTick {
    /// Insertion sequence, the final tie-breaker
    pub id: u64,
    pub at: Duration,
    pub kind: TickKind,
}

impl ScheduledTick {
    pub fn new(id: u64, at: Duration, kind: TickKind) -> Self {
        Self { id, at, kind }
    }
}

impl PartialEq for ScheduledTick {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ScheduledTick {}

impl Ord for ScheduledTick {
    // Reversed so `BinaryHeap` pops the earliest tick first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .at
            .cmp(&self.at)
            .then_with(|| other.kind.priority().cmp(&self.kind.priority()))
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for ScheduledTick {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BinaryHeap;

    use super::*;

    #[test]
    fn test_earliest_tick_pops_first_and_exchange_wins_ties() {
        let mut queue = BinaryHeap::new();
        queue.push(ScheduledTick::new(0, Duration::from_secs(30), TickKind::Mutation));
        queue.push(ScheduledTick::new(1, Duration::from_secs(30), TickKind::Exchange));
        queue.push(ScheduledTick::new(2, Duration::from_secs(5), TickKind::Exchange));

        let order: Vec<(u64, TickKind)> = std::iter::from_fn(|| queue.pop())
            .map(|tick| (tick.at.as_secs(), tick.kind))
            .collect();
        assert_eq!(
            order,
            vec![
                (5, TickKind::Exchange),
                (30, TickKind::Exchange),
                (30, TickKind::Mutation),
            ]
        );
    }
}
