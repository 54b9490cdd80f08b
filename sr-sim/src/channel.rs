//! Simulated unreliable channel
//!
//! [`Channel`] owns the virtual clock, the event queue, and a seeded RNG.
//! Each packet handed to it is independently lost, corrupted, or delayed,
//! but arrivals within one direction never reorder: each packet's arrival
//! time is clamped to be no earlier than the previous arrival in the same
//! direction.
//!
//! The channel implements [`SenderIo`] and [`ReceiverIo`], so the protocol
//! state machines drive it directly; the harness drains its queue.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use sr_protocol::{Message, Packet, ReceiverIo, SenderIo};

use crate::event::{Event, EventKind, Role};

/// Knobs for the channel's unreliability.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Probability that a packet is silently dropped, in `[0, 1]`.
    pub loss_rate: f64,
    /// Probability that a surviving packet is mutated in transit, in `[0, 1]`.
    pub corruption_rate: f64,
    /// Minimum one-way transit time.
    pub transit_delay: Duration,
    /// Extra uniformly random delay added on top of `transit_delay`.
    pub jitter: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        ChannelConfig {
            loss_rate: 0.0,
            corruption_rate: 0.0,
            transit_delay: Duration::from_secs(5),
            jitter: Duration::from_secs(4),
        }
    }
}

impl ChannelConfig {
    /// Reject probabilities outside `[0, 1]` and a zero transit delay.
    pub fn validate(&self) -> Result<(), ChannelConfigError> {
        if !(0.0..=1.0).contains(&self.loss_rate) || !self.loss_rate.is_finite() {
            return Err(ChannelConfigError::LossRate(self.loss_rate));
        }
        if !(0.0..=1.0).contains(&self.corruption_rate) || !self.corruption_rate.is_finite() {
            return Err(ChannelConfigError::CorruptionRate(self.corruption_rate));
        }
        if self.transit_delay.is_zero() {
            return Err(ChannelConfigError::ZeroTransitDelay);
        }
        Ok(())
    }
}

/// Channel configuration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChannelConfigError {
    #[error("loss rate {0} outside [0, 1]")]
    LossRate(f64),

    #[error("corruption rate {0} outside [0, 1]")]
    CorruptionRate(f64),

    #[error("transit delay must be positive")]
    ZeroTransitDelay,
}

/// Channel-side counters.
#[derive(Debug, Clone, Default)]
pub struct ChannelStats {
    /// Packets handed to the channel in either direction
    pub packets_sent: u64,
    /// Packets silently dropped
    pub packets_lost: u64,
    /// Packets mutated in transit
    pub packets_corrupted: u64,
}

/// The simulated channel plus the simulation's clock and event queue.
pub struct Channel {
    config: ChannelConfig,
    rng: StdRng,
    now: Duration,
    queue: BinaryHeap<Reverse<Event>>,
    next_order: u64,
    /// Latest scheduled arrival per direction, enforces in-order transit.
    last_arrival: [Duration; 2],
    /// Current timer generation; expiries from older generations are stale.
    timer_epoch: u64,
    timer_armed: bool,
    /// Messages released by the receiver, in delivery order.
    pub delivered: Vec<Message>,
    stats: ChannelStats,
}

impl Channel {
    pub fn new(config: ChannelConfig, seed: u64) -> Result<Self, ChannelConfigError> {
        config.validate()?;
        Ok(Channel {
            config,
            rng: StdRng::seed_from_u64(seed),
            now: Duration::ZERO,
            queue: BinaryHeap::new(),
            next_order: 0,
            last_arrival: [Duration::ZERO; 2],
            timer_epoch: 0,
            timer_armed: false,
            delivered: Vec::new(),
            stats: ChannelStats::default(),
        })
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn stats(&self) -> &ChannelStats {
        &self.stats
    }

    /// Enqueue an event at absolute virtual time `at`.
    pub fn schedule(&mut self, at: Duration, kind: EventKind) {
        debug_assert!(at >= self.now, "event scheduled in the past");
        let order = self.next_order;
        self.next_order += 1;
        self.queue.push(Reverse(Event {
            time: at,
            order,
            kind,
        }));
    }

    /// Pop the earliest event and advance the clock to it.
    pub fn pop(&mut self) -> Option<Event> {
        let Reverse(event) = self.queue.pop()?;
        self.now = event.time;
        Some(event)
    }

    /// Whether a popped [`EventKind::TimerExpiry`] is still live. Consumes
    /// the armed state on success so the sender re-arms explicitly.
    pub fn consume_timeout(&mut self, epoch: u64) -> bool {
        if self.timer_armed && epoch == self.timer_epoch {
            self.timer_armed = false;
            true
        } else {
            tracing::trace!(epoch, current = self.timer_epoch, "stale timer expiry discarded");
            false
        }
    }

    /// Subject one packet to loss, corruption, and delay, then schedule its
    /// arrival at `dest`.
    fn transmit(&mut self, dest: Role, mut packet: Packet) {
        self.stats.packets_sent += 1;

        if self.rng.gen::<f64>() < self.config.loss_rate {
            self.stats.packets_lost += 1;
            tracing::trace!(?dest, "channel dropped packet");
            return;
        }
        if self.rng.gen::<f64>() < self.config.corruption_rate {
            self.corrupt(&mut packet);
            self.stats.packets_corrupted += 1;
            tracing::trace!(?dest, "channel corrupted packet");
        }

        let jitter = if self.config.jitter.is_zero() {
            Duration::ZERO
        } else {
            self.config.jitter.mul_f64(self.rng.gen::<f64>())
        };
        // Clamp to the previous arrival in this direction: delayed packets
        // may bunch up, but they never overtake.
        let arrival = (self.now + self.config.transit_delay + jitter)
            .max(self.last_arrival[dest.index()]);
        self.last_arrival[dest.index()] = arrival;
        self.schedule(arrival, EventKind::Arrival { dest, packet });
    }

    /// Mutate one of the three checksummed regions. Every variant leaves
    /// the stored checksum inconsistent with the contents.
    fn corrupt(&mut self, packet: &mut Packet) {
        match self.rng.gen_range(0..3u8) {
            0 => packet.payload[0] ^= 0xff,
            1 => packet.checksum = packet.checksum.wrapping_add(1),
            _ => {
                if let Some(seq) = packet.seqnum {
                    packet.seqnum = Some(seq.next());
                } else if let Some(ack) = packet.acknum {
                    packet.acknum = Some(ack.next());
                } else {
                    packet.checksum = packet.checksum.wrapping_add(1);
                }
            }
        }
    }
}

impl SenderIo for Channel {
    fn send_to_channel(&mut self, packet: Packet) {
        self.transmit(Role::Receiver, packet);
    }

    fn start_timer(&mut self, timeout: Duration) {
        debug_assert!(!self.timer_armed, "timer started while already running");
        self.timer_epoch += 1;
        self.timer_armed = true;
        let epoch = self.timer_epoch;
        self.schedule(self.now + timeout, EventKind::TimerExpiry { epoch });
    }

    fn stop_timer(&mut self) {
        // The expiry event stays queued; bumping the epoch makes it stale.
        self.timer_epoch += 1;
        self.timer_armed = false;
    }
}

impl ReceiverIo for Channel {
    fn send_to_channel(&mut self, packet: Packet) {
        self.transmit(Role::Sender, packet);
    }

    fn deliver(&mut self, message: Message) {
        self.delivered.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sr_protocol::{SeqNumber, PAYLOAD_SIZE};

    fn data(seq: u16) -> Packet {
        Packet::data(SeqNumber::new(seq), &Message::new([seq as u8; PAYLOAD_SIZE]))
    }

    fn drain_arrivals(channel: &mut Channel) -> Vec<(Role, Packet, Duration)> {
        let mut out = Vec::new();
        while let Some(event) = channel.pop() {
            if let EventKind::Arrival { dest, packet } = event.kind {
                out.push((dest, packet, event.time));
            }
        }
        out
    }

    #[test]
    fn lossless_channel_delivers_everything() {
        let mut channel = Channel::new(ChannelConfig::default(), 1).unwrap();
        for s in 0..4 {
            SenderIo::send_to_channel(&mut channel, data(s));
        }
        let arrivals = drain_arrivals(&mut channel);
        assert_eq!(arrivals.len(), 4);
        assert!(arrivals.iter().all(|(_, p, _)| !p.is_corrupted()));
        assert_eq!(channel.stats().packets_lost, 0);
    }

    #[test]
    fn full_loss_drops_everything() {
        let config = ChannelConfig {
            loss_rate: 1.0,
            ..ChannelConfig::default()
        };
        let mut channel = Channel::new(config, 1).unwrap();
        for s in 0..8 {
            SenderIo::send_to_channel(&mut channel, data(s));
        }
        assert!(drain_arrivals(&mut channel).is_empty());
        assert_eq!(channel.stats().packets_lost, 8);
    }

    #[test]
    fn full_corruption_is_always_detectable() {
        let config = ChannelConfig {
            corruption_rate: 1.0,
            ..ChannelConfig::default()
        };
        // Many seeds so all three corruption variants are exercised.
        for seed in 0..20 {
            let mut channel = Channel::new(config.clone(), seed).unwrap();
            for s in 0..12 {
                SenderIo::send_to_channel(&mut channel, data(s));
                ReceiverIo::send_to_channel(&mut channel, Packet::ack(SeqNumber::new(s)));
            }
            let arrivals = drain_arrivals(&mut channel);
            assert_eq!(arrivals.len(), 24);
            assert!(arrivals.iter().all(|(_, p, _)| p.is_corrupted()));
        }
    }

    #[test]
    fn arrivals_within_a_direction_never_reorder() {
        let mut channel = Channel::new(ChannelConfig::default(), 42).unwrap();
        for s in 0..12 {
            SenderIo::send_to_channel(&mut channel, data(s));
        }
        let arrivals = drain_arrivals(&mut channel);
        let seqs: Vec<u16> = arrivals
            .iter()
            .map(|(_, p, _)| p.seqnum.unwrap().as_raw())
            .collect();
        assert_eq!(seqs, (0..12).collect::<Vec<_>>());
        for pair in arrivals.windows(2) {
            assert!(pair[0].2 <= pair[1].2);
        }
    }

    #[test]
    fn directions_are_independent_streams() {
        let mut channel = Channel::new(ChannelConfig::default(), 7).unwrap();
        SenderIo::send_to_channel(&mut channel, data(0));
        ReceiverIo::send_to_channel(&mut channel, Packet::ack(SeqNumber::new(0)));

        let arrivals = drain_arrivals(&mut channel);
        assert_eq!(arrivals.len(), 2);
        assert!(arrivals.iter().any(|(d, _, _)| *d == Role::Receiver));
        assert!(arrivals.iter().any(|(d, _, _)| *d == Role::Sender));
    }

    #[test]
    fn stopped_timer_expiry_is_stale() {
        let mut channel = Channel::new(ChannelConfig::default(), 1).unwrap();
        SenderIo::start_timer(&mut channel, Duration::from_secs(16));
        SenderIo::stop_timer(&mut channel);

        let event = channel.pop().unwrap();
        let EventKind::TimerExpiry { epoch } = event.kind else {
            panic!("expected timer expiry");
        };
        assert!(!channel.consume_timeout(epoch));
    }

    #[test]
    fn restarted_timer_invalidates_old_expiry() {
        let mut channel = Channel::new(ChannelConfig::default(), 1).unwrap();
        SenderIo::start_timer(&mut channel, Duration::from_secs(16));
        SenderIo::stop_timer(&mut channel);
        SenderIo::start_timer(&mut channel, Duration::from_secs(16));

        // Two expiries queued; only the second generation is live.
        let first = channel.pop().unwrap();
        let second = channel.pop().unwrap();
        let (EventKind::TimerExpiry { epoch: e1 }, EventKind::TimerExpiry { epoch: e2 }) =
            (first.kind, second.kind)
        else {
            panic!("expected timer expiries");
        };
        assert!(!channel.consume_timeout(e1));
        assert!(channel.consume_timeout(e2));
        // Consumed once; replaying the same expiry does nothing.
        assert!(!channel.consume_timeout(e2));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let bad_loss = ChannelConfig {
            loss_rate: 1.5,
            ..ChannelConfig::default()
        };
        assert_eq!(
            bad_loss.validate(),
            Err(ChannelConfigError::LossRate(1.5))
        );

        let bad_delay = ChannelConfig {
            transit_delay: Duration::ZERO,
            ..ChannelConfig::default()
        };
        assert_eq!(
            bad_delay.validate(),
            Err(ChannelConfigError::ZeroTransitDelay)
        );
    }

    #[test]
    fn same_seed_same_schedule() {
        let config = ChannelConfig {
            loss_rate: 0.3,
            corruption_rate: 0.3,
            ..ChannelConfig::default()
        };
        let mut a = Channel::new(config.clone(), 99).unwrap();
        let mut b = Channel::new(config, 99).unwrap();
        for s in 0..12 {
            SenderIo::send_to_channel(&mut a, data(s));
            SenderIo::send_to_channel(&mut b, data(s));
        }
        let arrivals_a = drain_arrivals(&mut a);
        let arrivals_b = drain_arrivals(&mut b);
        assert_eq!(arrivals_a.len(), arrivals_b.len());
        for ((_, pa, ta), (_, pb, tb)) in arrivals_a.iter().zip(&arrivals_b) {
            assert_eq!(pa, pb);
            assert_eq!(ta, tb);
        }
    }
}
