//! Selective Repeat ARQ Protocol Core
//!
//! This crate implements the core Selective Repeat protocol, including the
//! packet model with additive checksumming, modular sequence-number
//! arithmetic, and the sender and receiver sliding-window state machines.
//!
//! The state machines are pure: all channel, timer, and delivery effects go
//! through the [`SenderIo`] and [`ReceiverIo`] collaborator traits, so the
//! same code runs unchanged under unit tests and under the discrete-event
//! simulation harness.

pub mod packet;
pub mod receiver;
pub mod sender;
pub mod sequence;

pub use packet::{Message, Packet, PAYLOAD_SIZE};
pub use receiver::{Receiver, ReceiverIo, ReceiverStats};
pub use sender::{Sender, SenderError, SenderIo, SenderStats, RETRANSMIT_TIMEOUT};
pub use sequence::{SeqNumber, SEQ_SPACE, WINDOW_SIZE};
