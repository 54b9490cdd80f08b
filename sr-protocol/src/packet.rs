//! Packet model and corruption detection
//!
//! Every unit exchanged through the simulated channel is a [`Packet`]: a
//! data packet carries a sequence number and a fixed-size payload, a pure
//! ACK carries only an acknowledgment number. Both directions share one
//! additive checksum over the header fields and the payload bytes;
//! [`Packet::is_corrupted`] recomputes it and compares. A mismatch anywhere
//! (header or payload) is reported identically as "corrupted".
//!
//! The checksum is a plain sum, not cryptographic — collisions are a known,
//! accepted limitation.

use crate::sequence::{SeqNumber, SEQ_SPACE};

/// Fixed size of every application payload, in bytes.
pub const PAYLOAD_SIZE: usize = 20;

// Checksum contribution of an absent header field. Outside [0, SEQ_SPACE),
// so an absent field can never alias a real sequence number.
const FIELD_UNUSED: u32 = SEQ_SPACE as u32;

/// A fixed-size application-layer message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message {
    pub data: [u8; PAYLOAD_SIZE],
}

impl Message {
    /// Create a message from exactly [`PAYLOAD_SIZE`] bytes.
    pub fn new(data: [u8; PAYLOAD_SIZE]) -> Self {
        Message { data }
    }

    /// Build a message from an arbitrary slice, truncating or zero-padding
    /// to [`PAYLOAD_SIZE`].
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut data = [0u8; PAYLOAD_SIZE];
        let n = bytes.len().min(PAYLOAD_SIZE);
        data[..n].copy_from_slice(&bytes[..n]);
        Message { data }
    }
}

impl From<[u8; PAYLOAD_SIZE]> for Message {
    fn from(data: [u8; PAYLOAD_SIZE]) -> Self {
        Message { data }
    }
}

/// One protocol datagram
///
/// `seqnum` is present on data packets, `acknum` on acknowledgments; a
/// field that does not apply is `None` rather than a sentinel value, so a
/// real sequence number can never be mistaken for "unused". Packets are
/// immutable values once built; the checksum is computed by the
/// constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Sequence number (data packets only).
    pub seqnum: Option<SeqNumber>,
    /// Acknowledgment number (ACK packets only).
    pub acknum: Option<SeqNumber>,
    /// Payload bytes; zero-filled on pure ACKs.
    pub payload: [u8; PAYLOAD_SIZE],
    /// Additive checksum over both header fields and the payload.
    pub checksum: u32,
}

impl Packet {
    /// Build a data packet carrying `message` under sequence number `seqnum`.
    pub fn data(seqnum: SeqNumber, message: &Message) -> Self {
        let mut packet = Packet {
            seqnum: Some(seqnum),
            acknum: None,
            payload: message.data,
            checksum: 0,
        };
        packet.checksum = packet.compute_checksum();
        packet
    }

    /// Build a pure acknowledgment for `acknum`.
    pub fn ack(acknum: SeqNumber) -> Self {
        let mut packet = Packet {
            seqnum: None,
            acknum: Some(acknum),
            payload: [0u8; PAYLOAD_SIZE],
            checksum: 0,
        };
        packet.checksum = packet.compute_checksum();
        packet
    }

    /// Sum of both header fields and all payload bytes. Deterministic, pure.
    pub fn compute_checksum(&self) -> u32 {
        let seq = self.seqnum.map_or(FIELD_UNUSED, |s| u32::from(s.as_raw()));
        let ack = self.acknum.map_or(FIELD_UNUSED, |a| u32::from(a.as_raw()));
        let payload: u32 = self.payload.iter().map(|&b| u32::from(b)).sum();
        seq + ack + payload
    }

    /// True iff the stored checksum disagrees with the recomputed one.
    pub fn is_corrupted(&self) -> bool {
        self.checksum != self.compute_checksum()
    }

    /// The payload as an application message.
    pub fn message(&self) -> Message {
        Message::new(self.payload)
    }
}
