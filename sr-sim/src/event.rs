//! Event queue primitives for the discrete-event simulation
//!
//! Virtual time is a [`Duration`] from session start. Events at equal
//! timestamps are ordered by a monotonically increasing insertion counter,
//! so runs with the same seed replay identically.

use std::cmp::Ordering;
use std::time::Duration;

use sr_protocol::Packet;

/// The two protocol entities attached to the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Sender,
    Receiver,
}

impl Role {
    /// Index for per-direction channel state.
    pub(crate) fn index(self) -> usize {
        match self {
            Role::Sender => 0,
            Role::Receiver => 1,
        }
    }
}

/// What happens when an event fires.
#[derive(Debug, Clone)]
pub enum EventKind {
    /// A packet emerges from the channel at `dest`.
    Arrival { dest: Role, packet: Packet },
    /// The sender's retransmission timer fires. Stale expiries carry an
    /// old epoch and are discarded on pop.
    TimerExpiry { epoch: u64 },
    /// The application layer offers the sender its next message.
    NextMessage,
}

/// One scheduled occurrence in virtual time.
#[derive(Debug, Clone)]
pub struct Event {
    pub time: Duration,
    /// Insertion counter, breaks timestamp ties deterministically.
    pub order: u64,
    pub kind: EventKind,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.order == other.order
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| self.order.cmp(&other.order))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: u64, order: u64) -> Event {
        Event {
            time: Duration::from_secs(secs),
            order,
            kind: EventKind::NextMessage,
        }
    }

    #[test]
    fn orders_by_time_then_insertion() {
        assert!(at(1, 5) < at(2, 0));
        assert!(at(3, 1) < at(3, 2));
        assert_eq!(at(3, 1), at(3, 1));
    }

    #[test]
    fn min_heap_pops_earliest_first() {
        use std::cmp::Reverse;
        use std::collections::BinaryHeap;

        let mut heap = BinaryHeap::new();
        heap.push(Reverse(at(5, 0)));
        heap.push(Reverse(at(1, 1)));
        heap.push(Reverse(at(5, 2)));

        let order: Vec<u64> = std::iter::from_fn(|| heap.pop().map(|Reverse(e)| e.order)).collect();
        assert_eq!(order, vec![1, 0, 2]);
    }
}
