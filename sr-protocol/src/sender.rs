//! Selective-Repeat send-side state machine
//!
//! [`Sender`] owns a bounded window of in-flight packets. Unlike Go-Back-N,
//! acknowledgments are per-packet: a non-base ACK suppresses that packet's
//! retransmission without moving the window, and a timeout resends only the
//! oldest unacknowledged packet.
//!
//! # Protocol contract
//!
//! - At most [`WINDOW_SIZE`] packets may be unacknowledged at once; further
//!   submissions are rejected with [`SenderError::WindowFull`] and the
//!   caller retries later.
//! - The window slides only when the ACK for the base itself arrives; it
//!   then advances past the whole contiguous acked prefix.
//! - One logical retransmission timer, always armed for the current base
//!   while anything is in flight, never armed while nothing is. Every
//!   restart is preceded by a stop so a stale timer can never linger.
//!
//! All channel and timer I/O goes through the [`SenderIo`] collaborator;
//! this module only manages state.

use std::time::Duration;

use thiserror::Error;

use crate::packet::{Message, Packet};
use crate::sequence::{SeqNumber, WINDOW_SIZE};

/// Fixed retransmission timeout, one round-trip time on the simulated
/// channel. No RTT estimation and no backoff; every retry waits this long.
pub const RETRANSMIT_TIMEOUT: Duration = Duration::from_secs(16);

/// Primitives the sender consumes from its collaborators: the unreliable
/// channel and the timer service.
pub trait SenderIo {
    /// Hand a packet to the channel. One-way, asynchronous; the channel may
    /// drop, corrupt, or delay it, but never reorders within a direction.
    fn send_to_channel(&mut self, packet: Packet);

    /// Arm the single logical retransmission timer.
    fn start_timer(&mut self, timeout: Duration);

    /// Disarm the timer. Must win over any expiry not yet delivered.
    fn stop_timer(&mut self);
}

/// Sender errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderError {
    /// The next sequence number lies outside `[base, base + WINDOW_SIZE)`,
    /// either because the window is full of unacknowledged packets or
    /// because acknowledged slots behind a gap have not slid yet.
    /// Backpressure, not failure: the message was not buffered and the
    /// caller must resubmit later.
    #[error("send window is full ({0} packets in flight)")]
    WindowFull(usize),
}

/// Sender-side counters, updated by every operation.
#[derive(Debug, Clone, Default)]
pub struct SenderStats {
    /// Data packets handed to the channel for the first time
    pub packets_sent: u64,
    /// Retransmissions of the window base after a timeout
    pub packets_resent: u64,
    /// Submissions rejected because the window was full
    pub window_full_rejections: u64,
    /// Uncorrupted ACK packets examined
    pub acks_received: u64,
    /// ACKs that retired a packet for the first time
    pub new_acks: u64,
    /// ACKs for an already-acknowledged in-window packet
    pub duplicate_acks: u64,
    /// ACKs discarded by the checksum test
    pub corrupted_acks: u64,
    /// Uncorrupted ACKs outside the current window
    pub stale_acks: u64,
}

/// One occupied slot in the retransmit window.
#[derive(Debug, Clone)]
struct SendSlot {
    /// The packet as originally sent, kept for retransmission.
    packet: Packet,
    /// Whether its individual ACK has arrived.
    acked: bool,
}

/// Selective-Repeat send-side state for one session.
///
/// # Window layout
///
/// ```text
///     base              next_seq
///      │                   │
///  ────┼───────────────────┼──────────────▶ seq space (mod SEQ_SPACE)
///      │ ◀── in flight ──▶ │ ◀─ admissible ─▶
/// ```
///
/// Slot `i` holds the packet with sequence number `base + i`; the array is
/// shifted down whenever the base advances.
pub struct Sender {
    /// Oldest unacknowledged sequence number (left window edge).
    base: SeqNumber,
    /// Sequence number for the next new packet.
    next_seq: SeqNumber,
    /// Occupied slots not yet acknowledged. Never exceeds [`WINDOW_SIZE`].
    in_flight: usize,
    /// Ring of outstanding packets, indexed relative to `base`.
    window: [Option<SendSlot>; WINDOW_SIZE],
    stats: SenderStats,
}

impl Sender {
    /// Create a sender at the start of a session: `base = 0`, `next = 0`,
    /// empty window.
    pub fn new() -> Self {
        Sender {
            base: SeqNumber::new(0),
            next_seq: SeqNumber::new(0),
            in_flight: 0,
            window: std::array::from_fn(|_| None),
            stats: SenderStats::default(),
        }
    }

    /// Slot index for an in-window sequence number.
    #[inline]
    fn index_of(&self, seq: SeqNumber) -> usize {
        seq.offset_from(self.base) as usize
    }

    /// Submit one application message.
    ///
    /// Assigns the next sequence number, stores the packet for possible
    /// retransmission, hands it to the channel, and starts the timer when
    /// this is the only outstanding packet. Returns the assigned sequence
    /// number, or [`SenderError::WindowFull`] without any state change.
    pub fn submit(
        &mut self,
        message: Message,
        io: &mut impl SenderIo,
    ) -> Result<SeqNumber, SenderError> {
        // Admission is window membership of the next sequence number, not
        // an occupancy count: packets acked behind a gap still hold their
        // slots until the base slides past them.
        if !self.next_seq.in_window(self.base) {
            self.stats.window_full_rejections += 1;
            tracing::debug!(base = %self.base, "send window full, rejecting message");
            return Err(SenderError::WindowFull(self.in_flight));
        }

        let seq = self.next_seq;
        let packet = Packet::data(seq, &message);

        let idx = self.index_of(seq);
        debug_assert!(self.window[idx].is_none(), "slot {} already occupied", idx);
        self.window[idx] = Some(SendSlot {
            packet: packet.clone(),
            acked: false,
        });
        self.in_flight += 1;
        self.stats.packets_sent += 1;

        tracing::debug!(seq = %seq, in_flight = self.in_flight, "sending data packet");
        io.send_to_channel(packet);

        // The timer tracks the oldest unacknowledged packet; it is armed
        // exactly when the window goes from empty to non-empty.
        if self.in_flight == 1 {
            io.start_timer(RETRANSMIT_TIMEOUT);
        }

        self.next_seq = self.next_seq.next();
        Ok(seq)
    }

    /// Process an inbound acknowledgment.
    ///
    /// Corrupted, stale, and duplicate ACKs are absorbed without state
    /// change. A new in-window ACK retires its packet; if it acknowledged
    /// the base, the window slides past the contiguous acked prefix and the
    /// timer is re-armed for the new base (or stopped if the window
    /// drained).
    pub fn on_ack(&mut self, packet: &Packet, io: &mut impl SenderIo) {
        if packet.is_corrupted() {
            self.stats.corrupted_acks += 1;
            tracing::trace!("corrupted ACK, ignoring");
            return;
        }
        let Some(acknum) = packet.acknum else {
            tracing::trace!("packet without acknum reached sender, ignoring");
            return;
        };
        self.stats.acks_received += 1;

        if !acknum.in_window(self.base) {
            self.stats.stale_acks += 1;
            tracing::trace!(ack = %acknum, base = %self.base, "ACK outside window, ignoring");
            return;
        }

        match &mut self.window[self.index_of(acknum)] {
            Some(slot) if !slot.acked => {
                slot.acked = true;
                self.in_flight -= 1;
                self.stats.new_acks += 1;
                tracing::debug!(ack = %acknum, in_flight = self.in_flight, "new ACK");
            }
            Some(_) => {
                self.stats.duplicate_acks += 1;
                tracing::debug!(ack = %acknum, "duplicate ACK, ignoring");
                return;
            }
            None => {
                // In-window slot that was never filled; nothing to retire.
                self.stats.stale_acks += 1;
                return;
            }
        }

        // Selective repeat slides only when the base itself is acked;
        // acked packets behind a gap stay buffered until the gap closes.
        if acknum == self.base {
            let advanced = self.slide_window();
            tracing::debug!(advanced, base = %self.base, "window slid");
            io.stop_timer();
            if self.in_flight > 0 {
                io.start_timer(RETRANSMIT_TIMEOUT);
            }
        }
    }

    /// Advance past the contiguous acked prefix, returning its length.
    fn slide_window(&mut self) -> usize {
        let advanced = self
            .window
            .iter()
            .take_while(|slot| matches!(slot, Some(s) if s.acked))
            .count();
        for slot in self.window.iter_mut().take(advanced) {
            *slot = None;
        }
        self.window.rotate_left(advanced);
        self.base = self.base + advanced as u16;
        advanced
    }

    /// Handle expiry of the retransmission timer.
    ///
    /// Resends only the packet at the window base and re-arms the timer.
    /// The timer is never armed with an empty window, so an expiry without
    /// an outstanding packet is traced and dropped.
    pub fn on_timeout(&mut self, io: &mut impl SenderIo) {
        let Some(slot) = &self.window[0] else {
            tracing::warn!("timeout with empty window, ignoring");
            return;
        };
        let packet = slot.packet.clone();
        tracing::debug!(seq = %self.base, "timeout, resending oldest unacked packet");
        self.stats.packets_resent += 1;
        io.send_to_channel(packet);
        io.start_timer(RETRANSMIT_TIMEOUT);
    }

    /// Oldest unacknowledged sequence number.
    pub fn base(&self) -> SeqNumber {
        self.base
    }

    /// Sequence number the next submission will receive.
    pub fn next_seq(&self) -> SeqNumber {
        self.next_seq
    }

    /// Number of packets awaiting acknowledgment.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// `true` when the next submission would be admitted.
    pub fn can_submit(&self) -> bool {
        self.next_seq.in_window(self.base)
    }

    /// Counters accumulated since session start.
    pub fn stats(&self) -> &SenderStats {
        &self.stats
    }
}

impl Default for Sender {
    fn default() -> Self {
        Self::new()
    }
}
