//! End-to-end simulation driver
//!
//! [`Simulation`] wires a [`Sender`] and [`Receiver`] to one [`Channel`]
//! and runs the event loop to completion: the application layer offers
//! messages at a configurable rate, backpressured submissions retry after a
//! delay, and the run ends when every message has been delivered in order
//! (or the virtual-time ceiling proves it never will be).

use std::time::Duration;

use thiserror::Error;

use sr_protocol::{
    Message, Receiver, ReceiverStats, Sender, SenderError, SenderStats, PAYLOAD_SIZE,
};

use crate::channel::{Channel, ChannelConfig, ChannelConfigError, ChannelStats};
use crate::event::{EventKind, Role};

/// Parameters for one simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Messages the application layer generates.
    pub message_count: usize,
    /// Virtual time between consecutive application messages.
    pub message_interval: Duration,
    /// Delay before a backpressured message is offered again.
    pub retry_delay: Duration,
    /// RNG seed; identical seeds replay identical runs.
    pub seed: u64,
    pub channel: ChannelConfig,
    /// Ceiling on virtual time, catches livelocked configurations.
    pub max_virtual_time: Duration,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            message_count: 20,
            message_interval: Duration::from_secs(10),
            retry_delay: Duration::from_secs(10),
            seed: 0,
            channel: ChannelConfig::default(),
            max_virtual_time: Duration::from_secs(1_000_000),
        }
    }
}

/// Simulation errors
#[derive(Error, Debug)]
pub enum SimError {
    #[error(transparent)]
    Channel(#[from] ChannelConfigError),

    /// The event queue drained with messages still undelivered. Indicates a
    /// protocol bug: an armed timer should always keep the run moving.
    #[error("simulation stalled after {delivered} of {expected} deliveries")]
    Stalled { delivered: usize, expected: usize },

    #[error("virtual time ceiling reached after {delivered} of {expected} deliveries")]
    TimeExceeded { delivered: usize, expected: usize },

    /// A delivered message differed from the one submitted at that position.
    #[error("delivery {index} out of order or altered")]
    DeliveryMismatch { index: usize },
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct SimReport {
    /// Messages delivered to the receiving application, equals the
    /// configured count on success.
    pub delivered: usize,
    /// Virtual time consumed.
    pub elapsed: Duration,
    pub sender: SenderStats,
    pub receiver: ReceiverStats,
    pub channel: ChannelStats,
}

/// Deterministic payload for the `index`-th application message.
pub fn make_message(index: usize) -> Message {
    let tag = b'a' + (index % 26) as u8;
    let mut data = [tag; PAYLOAD_SIZE];
    // Low bytes of the index disambiguate messages sharing a tag.
    data[0] = (index & 0xff) as u8;
    data[1] = ((index >> 8) & 0xff) as u8;
    Message::new(data)
}

/// One sender, one receiver, one unreliable channel between them.
pub struct Simulation {
    config: SimConfig,
    sender: Sender,
    receiver: Receiver,
    channel: Channel,
    /// Index of the next message the application will offer.
    next_message: usize,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        let channel = Channel::new(config.channel.clone(), config.seed)?;
        Ok(Simulation {
            config,
            sender: Sender::new(),
            receiver: Receiver::new(),
            channel,
            next_message: 0,
        })
    }

    /// Run to completion and verify every delivery.
    pub fn run(mut self) -> Result<SimReport, SimError> {
        tracing::info!(
            messages = self.config.message_count,
            loss = self.config.channel.loss_rate,
            corruption = self.config.channel.corruption_rate,
            seed = self.config.seed,
            "starting simulation"
        );

        if self.config.message_count > 0 {
            self.channel.schedule(Duration::ZERO, EventKind::NextMessage);
        }

        while self.channel.delivered.len() < self.config.message_count {
            let Some(event) = self.channel.pop() else {
                return Err(SimError::Stalled {
                    delivered: self.channel.delivered.len(),
                    expected: self.config.message_count,
                });
            };
            if event.time > self.config.max_virtual_time {
                return Err(SimError::TimeExceeded {
                    delivered: self.channel.delivered.len(),
                    expected: self.config.message_count,
                });
            }

            match event.kind {
                EventKind::Arrival {
                    dest: Role::Sender,
                    packet,
                } => self.sender.on_ack(&packet, &mut self.channel),
                EventKind::Arrival {
                    dest: Role::Receiver,
                    packet,
                } => self.receiver.on_packet(&packet, &mut self.channel),
                EventKind::TimerExpiry { epoch } => {
                    if self.channel.consume_timeout(epoch) {
                        self.sender.on_timeout(&mut self.channel);
                    }
                }
                EventKind::NextMessage => self.offer_message(),
            }
        }

        self.verify_deliveries()?;

        let report = SimReport {
            delivered: self.channel.delivered.len(),
            elapsed: self.channel.now(),
            sender: self.sender.stats().clone(),
            receiver: self.receiver.stats().clone(),
            channel: self.channel.stats().clone(),
        };
        tracing::info!(
            delivered = report.delivered,
            elapsed_secs = report.elapsed.as_secs(),
            resent = report.sender.packets_resent,
            "simulation complete"
        );
        Ok(report)
    }

    /// The application offers its next message. Backpressure reschedules
    /// the same message; acceptance schedules the one after it.
    fn offer_message(&mut self) {
        let message = make_message(self.next_message);
        match self.sender.submit(message, &mut self.channel) {
            Ok(_) => {
                self.next_message += 1;
                if self.next_message < self.config.message_count {
                    self.channel.schedule(
                        self.channel.now() + self.config.message_interval,
                        EventKind::NextMessage,
                    );
                }
            }
            Err(SenderError::WindowFull(_)) => {
                self.channel.schedule(
                    self.channel.now() + self.config.retry_delay,
                    EventKind::NextMessage,
                );
            }
        }
    }

    /// Every delivered message must match its submission, byte for byte,
    /// position for position.
    fn verify_deliveries(&self) -> Result<(), SimError> {
        for (index, message) in self.channel.delivered.iter().enumerate() {
            if *message != make_message(index) {
                return Err(SimError::DeliveryMismatch { index });
            }
        }
        Ok(())
    }
}
