//! Configuration file support for the simulation CLI

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use sr_sim::{ChannelConfig, SimConfig};

/// Simulation run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of application messages to send
    #[serde(default = "default_message_count")]
    pub message_count: usize,
    /// Virtual seconds between application messages
    #[serde(default = "default_message_interval")]
    pub message_interval_secs: u64,
    /// Virtual seconds before retrying a backpressured message
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
    /// RNG seed for reproducible runs
    #[serde(default)]
    pub seed: u64,
    /// Packet loss probability (0.0 to 1.0)
    #[serde(default)]
    pub loss_rate: f64,
    /// Packet corruption probability (0.0 to 1.0)
    #[serde(default)]
    pub corruption_rate: f64,
    /// Minimum one-way transit time in virtual seconds
    #[serde(default = "default_transit_delay")]
    pub transit_delay_secs: u64,
    /// Maximum extra random delay in virtual seconds
    #[serde(default = "default_jitter")]
    pub jitter_secs: u64,
    /// Virtual-time ceiling in seconds
    #[serde(default = "default_max_virtual_time")]
    pub max_virtual_time_secs: u64,
}

fn default_message_count() -> usize {
    20
}

fn default_message_interval() -> u64 {
    10
}

fn default_retry_delay() -> u64 {
    10
}

fn default_transit_delay() -> u64 {
    5
}

fn default_jitter() -> u64 {
    4
}

fn default_max_virtual_time() -> u64 {
    1_000_000
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            message_count: default_message_count(),
            message_interval_secs: default_message_interval(),
            retry_delay_secs: default_retry_delay(),
            seed: 0,
            loss_rate: 0.0,
            corruption_rate: 0.0,
            transit_delay_secs: default_transit_delay(),
            jitter_secs: default_jitter(),
            max_virtual_time_secs: default_max_virtual_time(),
        }
    }
}

impl SimulationConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: SimulationConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges before handing the config to the simulator
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.loss_rate) || !self.loss_rate.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "loss_rate {} outside [0, 1]",
                self.loss_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.corruption_rate) || !self.corruption_rate.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "corruption_rate {} outside [0, 1]",
                self.corruption_rate
            )));
        }
        if self.transit_delay_secs == 0 {
            return Err(ConfigError::Invalid(
                "transit_delay_secs must be positive".to_string(),
            ));
        }
        if self.max_virtual_time_secs == 0 {
            return Err(ConfigError::Invalid(
                "max_virtual_time_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Create an example configuration for a moderately lossy channel
    pub fn example() -> Self {
        SimulationConfig {
            message_count: 50,
            loss_rate: 0.2,
            corruption_rate: 0.1,
            seed: 42,
            ..SimulationConfig::default()
        }
    }

    /// Convert to the simulation harness configuration
    pub fn to_sim_config(&self) -> SimConfig {
        SimConfig {
            message_count: self.message_count,
            message_interval: Duration::from_secs(self.message_interval_secs),
            retry_delay: Duration::from_secs(self.retry_delay_secs),
            seed: self.seed,
            channel: ChannelConfig {
                loss_rate: self.loss_rate,
                corruption_rate: self.corruption_rate,
                transit_delay: Duration::from_secs(self.transit_delay_secs),
                jitter: Duration::from_secs(self.jitter_secs),
            },
            max_virtual_time: Duration::from_secs(self.max_virtual_time_secs),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
