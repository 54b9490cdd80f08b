//! Property tests for the sliding-window state machines
//!
//! Random operation sequences and arrival orders, checked against the
//! invariants that hold no matter what the channel does.

use std::time::Duration;

use proptest::prelude::*;

use sr_protocol::packet::{Message, Packet, PAYLOAD_SIZE};
use sr_protocol::receiver::{Receiver, ReceiverIo};
use sr_protocol::sender::{Sender, SenderIo};
use sr_protocol::sequence::{SeqNumber, SEQ_SPACE, WINDOW_SIZE};

#[derive(Default)]
struct SenderSink {
    sent: Vec<Packet>,
}

impl SenderIo for SenderSink {
    fn send_to_channel(&mut self, packet: Packet) {
        self.sent.push(packet);
    }
    fn start_timer(&mut self, _timeout: Duration) {}
    fn stop_timer(&mut self) {}
}

#[derive(Default)]
struct ReceiverSink {
    acks: Vec<Packet>,
    delivered: Vec<Message>,
}

impl ReceiverIo for ReceiverSink {
    fn send_to_channel(&mut self, packet: Packet) {
        self.acks.push(packet);
    }
    fn deliver(&mut self, message: Message) {
        self.delivered.push(message);
    }
}

/// One randomly chosen action against the sender.
#[derive(Debug, Clone)]
enum SenderOp {
    Submit,
    Ack(u16),
    Timeout,
}

fn sender_op() -> impl Strategy<Value = SenderOp> {
    prop_oneof![
        3 => Just(SenderOp::Submit),
        3 => (0..SEQ_SPACE).prop_map(SenderOp::Ack),
        1 => Just(SenderOp::Timeout),
    ]
}

proptest! {
    /// No interleaving of submissions, arbitrary ACKs, and timeouts may
    /// push occupancy past the window, move the base backward, or send a
    /// packet from outside the window.
    #[test]
    fn prop_sender_invariants_hold_under_random_ops(
        ops in proptest::collection::vec(sender_op(), 1..200)
    ) {
        let mut sender = Sender::new();
        let mut io = SenderSink::default();
        let mut base_travel = 0u64;

        for op in ops {
            let before = sender.base();
            match op {
                SenderOp::Submit => {
                    let _ = sender.submit(Message::new([0u8; PAYLOAD_SIZE]), &mut io);
                }
                SenderOp::Ack(raw) => {
                    sender.on_ack(&Packet::ack(SeqNumber::new(raw)), &mut io);
                }
                SenderOp::Timeout => {
                    if sender.in_flight() > 0 {
                        sender.on_timeout(&mut io);
                    }
                }
            }
            prop_assert!(sender.in_flight() <= WINDOW_SIZE);
            // The base only ever moves forward, at most a window at a time.
            let advance = sender.base().offset_from(before);
            prop_assert!(advance as usize <= WINDOW_SIZE);
            base_travel += u64::from(advance);
            // Everything on the wire was in some window when sent.
            prop_assert!(io.sent.iter().all(|p| p.seqnum.is_some()));
        }
        // The base never travels past the number of packets ever acked.
        prop_assert!(base_travel <= sender.stats().new_acks);
    }

    /// A window of packets arriving in any order is delivered in exactly
    /// sequence order once the window is complete.
    #[test]
    fn prop_receiver_delivers_any_permutation_in_order(
        order in Just((0..WINDOW_SIZE as u16).collect::<Vec<_>>()).prop_shuffle()
    ) {
        let mut receiver = Receiver::new();
        let mut io = ReceiverSink::default();

        for &s in &order {
            let packet = Packet::data(
                SeqNumber::new(s),
                &Message::new([s as u8; PAYLOAD_SIZE]),
            );
            receiver.on_packet(&packet, &mut io);
        }

        let tags: Vec<u8> = io.delivered.iter().map(|m| m.data[0]).collect();
        prop_assert_eq!(tags, (0..WINDOW_SIZE as u8).collect::<Vec<_>>());
        prop_assert_eq!(io.acks.len(), WINDOW_SIZE);
    }

    /// Whatever mix of new packets and duplicates arrives, deliveries
    /// follow the base: the i-th delivery always carries sequence number
    /// i mod SEQ_SPACE, with no gaps and no repeats.
    #[test]
    fn prop_receiver_delivery_sequence_is_gapless(
        seqs in proptest::collection::vec(0..SEQ_SPACE, 1..300)
    ) {
        let mut receiver = Receiver::new();
        let mut io = ReceiverSink::default();

        for s in seqs {
            let packet = Packet::data(
                SeqNumber::new(s),
                &Message::new([s as u8; PAYLOAD_SIZE]),
            );
            receiver.on_packet(&packet, &mut io);
            // Every uncorrupted packet elicits exactly one ACK.
            prop_assert_eq!(
                io.acks.len() as u64,
                receiver.stats().packets_received
            );
        }

        for (i, message) in io.delivered.iter().enumerate() {
            prop_assert_eq!(message.data[0], (i % SEQ_SPACE as usize) as u8);
        }
    }
}
