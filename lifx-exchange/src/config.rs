//! Configuration for the exchange engine
//!
//! Controls where messages go, how long each attempt waits, how many
//! attempts an exchange gets and how fast repeated sends are paced.

use std::time::Duration;

use lifx_protocol::header::HEADER_SIZE;
use lifx_protocol::DEFAULT_PORT;

use crate::error::{ExchangeError, Result};

/// Timeout and attempt budget for one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeOptions {
    /// Wait per attempt, measured from that attempt's send
    pub timeout: Duration,
    pub max_attempts: u32,
}

impl ExchangeOptions {
    pub fn new(timeout: Duration, max_attempts: u32) -> Self {
        Self {
            timeout,
            max_attempts,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(ExchangeError::InvalidParameter(
                "Timeout must be greater than 0".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(ExchangeError::InvalidParameter(
                "Attempt count must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Rough upper bound on how long the exchange can take
    pub fn budget(&self) -> Duration {
        self.timeout * self.max_attempts
    }
}

/// Configuration for the ExchangeEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeConfig {
    /// Destination port for every send
    /// Default: 56700
    pub port: u16,

    /// Wait per attempt
    /// Default: 1 second
    pub timeout: Duration,

    /// Attempts for unicast request/response
    /// Default: 3
    pub unicast_attempts: u32,

    /// Attempts for broadcast collect
    /// Default: 2
    pub broadcast_attempts: u32,

    /// Extra wait added to `timeout` when collecting broadcast acknowledgements
    /// Default: 500 ms
    pub ack_timeout_bonus: Duration,

    /// Repeat counts above this are paced by `burst_interval`
    /// Default: 20
    pub burst_threshold: usize,

    /// Pause between paced repeats
    /// Default: 50 ms
    pub burst_interval: Duration,

    /// Receive buffer per socket
    /// Default: 1024 bytes
    pub buffer_size: usize,

    /// Devices expected to answer a broadcast; `None` runs the full budget
    /// Default: None
    pub expected_devices: Option<usize>,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            timeout: Duration::from_secs(1),
            unicast_attempts: 3,
            broadcast_attempts: 2,
            ack_timeout_bonus: Duration::from_millis(500),
            burst_threshold: 20,
            burst_interval: Duration::from_millis(50),
            buffer_size: 1024,
            expected_devices: None,
        }
    }
}

impl ExchangeConfig {
    /// Create a new ExchangeConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Short waits for a quiet, wired network
    pub fn fast() -> Self {
        Self {
            timeout: Duration::from_millis(250),
            ack_timeout_bonus: Duration::from_millis(250),
            ..Default::default()
        }
    }

    /// Longer waits and more attempts for congested or lossy Wi-Fi
    pub fn lossy_network() -> Self {
        Self {
            timeout: Duration::from_secs(2),
            unicast_attempts: 5,
            broadcast_attempts: 3,
            ..Default::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_unicast_attempts(mut self, attempts: u32) -> Self {
        self.unicast_attempts = attempts;
        self
    }

    pub fn with_broadcast_attempts(mut self, attempts: u32) -> Self {
        self.broadcast_attempts = attempts;
        self
    }

    pub fn with_ack_timeout_bonus(mut self, bonus: Duration) -> Self {
        self.ack_timeout_bonus = bonus;
        self
    }

    pub fn with_burst(mut self, threshold: usize, interval: Duration) -> Self {
        self.burst_threshold = threshold;
        self.burst_interval = interval;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_expected_devices(mut self, count: usize) -> Self {
        self.expected_devices = Some(count);
        self
    }

    pub fn unicast(&self) -> ExchangeOptions {
        ExchangeOptions::new(self.timeout, self.unicast_attempts)
    }

    pub fn broadcast(&self) -> ExchangeOptions {
        ExchangeOptions::new(self.timeout, self.broadcast_attempts)
    }

    /// Broadcast options for acknowledgement collection
    pub fn broadcast_ack(&self) -> ExchangeOptions {
        ExchangeOptions::new(self.timeout + self.ack_timeout_bonus, self.broadcast_attempts)
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(ExchangeError::InvalidParameter(
                "Port must be greater than 0".to_string(),
            ));
        }

        self.unicast().validate()?;
        self.broadcast().validate()?;

        if self.buffer_size < HEADER_SIZE {
            return Err(ExchangeError::InvalidParameter(format!(
                "Buffer size must hold at least a {}-byte header",
                HEADER_SIZE
            )));
        }

        if self.expected_devices == Some(0) {
            return Err(ExchangeError::InvalidParameter(
                "Expected device count must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
