//! Selective-Repeat receive-side state machine
//!
//! [`Receiver`] buffers out-of-order arrivals inside its window and releases
//! messages to the application strictly in sequence-number order. Every
//! uncorrupted data packet is acknowledged individually, including
//! duplicates of packets already delivered, since a lost ACK leaves the
//! sender retransmitting until one gets through.
//!
//! With `SEQ_SPACE == 2 * WINDOW_SIZE` the sequence space splits exactly
//! into the current window `[base, base + W)` and the previous window
//! `[base - W, base)`. An uncorrupted packet is therefore either buffered
//! (current window) or re-acknowledged as a duplicate (previous window);
//! there is no third region.

use crate::packet::{Message, Packet};
use crate::sequence::{SeqNumber, WINDOW_SIZE};

/// Primitives the receiver consumes from its collaborators: the return
/// channel for ACKs and the application delivery path.
pub trait ReceiverIo {
    /// Hand an ACK packet to the channel back toward the sender.
    fn send_to_channel(&mut self, packet: Packet);

    /// Release one message to the application. Calls arrive in strict
    /// sequence order with no gaps and no repeats.
    fn deliver(&mut self, message: Message);
}

/// Receiver-side counters, updated by every operation.
#[derive(Debug, Clone, Default)]
pub struct ReceiverStats {
    /// Uncorrupted data packets examined
    pub packets_received: u64,
    /// Packets discarded by the checksum test
    pub corrupted_packets: u64,
    /// In-window packets buffered for the first time
    pub packets_buffered: u64,
    /// Retransmits of packets already buffered or already delivered
    pub duplicate_packets: u64,
    /// Messages released to the application
    pub messages_delivered: u64,
    /// ACK packets sent back, including duplicate re-ACKs
    pub acks_sent: u64,
}

/// Selective-Repeat receive-side state for one session.
///
/// Slot `i` of the buffer holds the message with sequence number
/// `base + i`, present once that packet has arrived. Slot 0 filling is
/// what triggers delivery: the contiguous prefix drains to the
/// application and the window slides past it.
pub struct Receiver {
    /// Next sequence number owed to the application (left window edge).
    base: SeqNumber,
    /// Out-of-order messages awaiting the packets before them.
    buffer: [Option<Message>; WINDOW_SIZE],
    stats: ReceiverStats,
}

impl Receiver {
    /// Create a receiver at the start of a session: `base = 0`, empty
    /// buffer.
    pub fn new() -> Self {
        Receiver {
            base: SeqNumber::new(0),
            buffer: std::array::from_fn(|_| None),
            stats: ReceiverStats::default(),
        }
    }

    /// Process an inbound data packet.
    ///
    /// Corrupted packets elicit an ACK for the last in-order sequence
    /// number so a sender blocked on a corrupted base retransmission is
    /// not left waiting for a full timeout on every copy. Uncorrupted
    /// packets are acknowledged under their own number, buffered if new,
    /// and delivery runs whenever the window base fills in.
    pub fn on_packet(&mut self, packet: &Packet, io: &mut impl ReceiverIo) {
        if packet.is_corrupted() {
            self.stats.corrupted_packets += 1;
            // base - 1 is the newest sequence number already consumed; at
            // session start nothing has been, and the sender discards the
            // resulting stale ACK through its own window test.
            let last_in_order = self.base - 1;
            tracing::trace!(ack = %last_in_order, "corrupted packet, re-acking last in-order");
            self.send_ack(last_in_order, io);
            return;
        }
        let Some(seqnum) = packet.seqnum else {
            tracing::trace!("packet without seqnum reached receiver, ignoring");
            return;
        };
        self.stats.packets_received += 1;

        if !seqnum.in_window(self.base) {
            // Previous window: the packet was delivered already but its ACK
            // was lost. Re-ACK so the sender can retire it and move on.
            self.stats.duplicate_packets += 1;
            tracing::debug!(seq = %seqnum, base = %self.base, "duplicate from previous window, re-acking");
            self.send_ack(seqnum, io);
            return;
        }

        let idx = seqnum.offset_from(self.base) as usize;
        if self.buffer[idx].is_some() {
            // Already buffered but not yet deliverable; the earlier ACK was
            // presumably lost.
            self.stats.duplicate_packets += 1;
            tracing::debug!(seq = %seqnum, "duplicate in-window packet, re-acking");
        } else {
            self.buffer[idx] = Some(packet.message());
            self.stats.packets_buffered += 1;
            tracing::debug!(seq = %seqnum, slot = idx, "buffered data packet");
        }
        self.send_ack(seqnum, io);

        if idx == 0 {
            self.deliver_prefix(io);
        }
    }

    /// Release the contiguous prefix and slide the window past it.
    fn deliver_prefix(&mut self, io: &mut impl ReceiverIo) {
        let ready = self
            .buffer
            .iter()
            .take_while(|slot| slot.is_some())
            .count();
        for slot in self.buffer.iter_mut().take(ready) {
            let Some(message) = slot.take() else {
                // Unreachable: `ready` counts only occupied slots.
                break;
            };
            self.stats.messages_delivered += 1;
            io.deliver(message);
        }
        self.buffer.rotate_left(ready);
        self.base = self.base + ready as u16;
        tracing::debug!(delivered = ready, base = %self.base, "delivered in-order prefix");
    }

    fn send_ack(&mut self, acknum: SeqNumber, io: &mut impl ReceiverIo) {
        self.stats.acks_sent += 1;
        io.send_to_channel(Packet::ack(acknum));
    }

    /// Next sequence number owed to the application.
    pub fn base(&self) -> SeqNumber {
        self.base
    }

    /// Counters accumulated since session start.
    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }
}

impl Default for Receiver {
    fn default() -> Self {
        Self::new()
    }
}
