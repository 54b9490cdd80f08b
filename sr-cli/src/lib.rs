//! CLI support library for the Selective Repeat simulator
//!
//! Houses the TOML configuration layer and the statistics display used by
//! the `sr-simulate` binary.

pub mod config;
pub mod stats;

pub use config::{ConfigError, SimulationConfig};
