//! Discrete-Event Simulation for the Selective Repeat Core
//!
//! This crate supplies the unreliable medium the protocol is designed to
//! survive: a seeded, deterministic channel that loses, corrupts, and
//! delays packets (without reordering within a direction), an event queue
//! driven in virtual time, and a harness that runs a full sender/receiver
//! session to completion and verifies in-order delivery.

pub mod channel;
pub mod event;
pub mod harness;

pub use channel::{Channel, ChannelConfig, ChannelConfigError, ChannelStats};
pub use event::{Event, EventKind, Role};
pub use harness::{make_message, SimConfig, SimError, SimReport, Simulation};
