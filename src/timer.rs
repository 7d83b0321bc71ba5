use alloc::collections::BinaryHeap;
use core::cmp::Ordering;
use core::task::Waker;

use crate::time::Instant;

/// Wake-up request: resume `target` once `deadline` is reached.
#[derive(Debug)]
pub struct ScheduledEvent {
    pub deadline: Instant,
    seq: u64,
    pub target: Waker,
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed so the max-heap yields the earliest deadline, then the earliest insertion.
impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Pending timer wake-ups, ordered by deadline. Equal deadlines fire in insertion order.
#[derive(Debug, Default)]
pub struct TimerQueue {
    events: BinaryHeap<ScheduledEvent>,
    next_seq: u64,
}

impl TimerQueue {
    pub const fn new() -> Self {
        Self {
            events: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    pub fn schedule(&mut self, deadline: Instant, target: Waker) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.push(ScheduledEvent {
            deadline,
            seq,
            target,
        });
    }

    /// Removes the event with the earliest deadline.
    pub fn pop(&mut self) -> Option<ScheduledEvent> {
        self.events.pop()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.events.peek().map(|event| event.deadline)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
