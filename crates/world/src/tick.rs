//! Scheduled block ticks.

use crate::block::BlockKind;
use redwire_core::{Position, SimTick};
use std::collections::{BTreeMap, HashSet};

/// A tick that came due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTick {
    /// Block position.
    pub pos: Position,
    /// Block kind the tick was scheduled for.
    pub kind: BlockKind,
    /// Tick it fired on.
    pub due: SimTick,
}

/// Deferred re-checks keyed by position and block kind.
///
/// At most one tick per `(pos, kind)` is pending; scheduling again while one
/// is pending is a no-op. Due ticks fire in `(due tick, insertion)` order.
#[derive(Debug, Default)]
pub struct ScheduledTickQueue {
    now: SimTick,
    next_seq: u64,
    pending: BTreeMap<(SimTick, u64), (Position, BlockKind)>,
    index: HashSet<(Position, BlockKind)>,
}

impl ScheduledTickQueue {
    /// Empty queue at tick zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current tick.
    pub fn now(&self) -> SimTick {
        self.now
    }

    /// Schedule `kind` at `pos` to tick `delay` ticks from now. A zero delay
    /// fires on the next advance.
    pub fn schedule(&mut self, pos: Position, kind: BlockKind, delay: u32) {
        if !self.index.insert((pos, kind)) {
            return;
        }
        let due = self.now.advance(u64::from(delay.max(1)));
        self.pending.insert((due, self.next_seq), (pos, kind));
        self.next_seq += 1;
    }

    /// Whether a tick is pending for `(pos, kind)`.
    pub fn contains(&self, pos: Position, kind: BlockKind) -> bool {
        self.index.contains(&(pos, kind))
    }

    /// Number of pending ticks.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Move to the next tick and return every tick that is now due.
    pub fn advance(&mut self) -> Vec<ScheduledTick> {
        self.now = self.now.advance(1);
        let mut due = Vec::new();
        while let Some(entry) = self.pending.first_entry() {
            if entry.key().0 > self.now {
                break;
            }
            let ((tick, _), (pos, kind)) = entry.remove_entry();
            self.index.remove(&(pos, kind));
            due.push(ScheduledTick {
                pos,
                kind,
                due: tick,
            });
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_queue_starts_at_tick_zero() {
        let queue = ScheduledTickQueue::new();
        assert_eq!(queue.now(), SimTick::ZERO);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_fires_after_delay() {
        let mut queue = ScheduledTickQueue::new();
        let pos = Position::new(1, 2, 3);
        queue.schedule(pos, BlockKind::Lamp, 3);
        assert!(queue.contains(pos, BlockKind::Lamp));
        assert!(queue.advance().is_empty());
        assert!(queue.advance().is_empty());
        let due = queue.advance();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].pos, pos);
        assert_eq!(due[0].due, SimTick(3));
        assert!(queue.is_empty());
        assert!(!queue.contains(pos, BlockKind::Lamp));
    }

    #[test]
    fn test_duplicate_schedule_is_coalesced() {
        let mut queue = ScheduledTickQueue::new();
        let pos = Position::ORIGIN;
        queue.schedule(pos, BlockKind::Button, 2);
        queue.schedule(pos, BlockKind::Button, 5);
        assert_eq!(queue.len(), 1);
        queue.schedule(pos, BlockKind::Lamp, 2);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_same_tick_fires_in_insertion_order() {
        let mut queue = ScheduledTickQueue::new();
        let a = Position::new(5, 0, 0);
        let b = Position::new(-5, 0, 0);
        queue.schedule(a, BlockKind::Lamp, 1);
        queue.schedule(b, BlockKind::Lamp, 1);
        let due = queue.advance();
        assert_eq!(due.iter().map(|t| t.pos).collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn test_can_reschedule_after_firing() {
        let mut queue = ScheduledTickQueue::new();
        let pos = Position::ORIGIN;
        queue.schedule(pos, BlockKind::Button, 1);
        assert_eq!(queue.advance().len(), 1);
        queue.schedule(pos, BlockKind::Button, 1);
        assert_eq!(queue.advance().len(), 1);
    }
}
