use std::time::Duration;

use crate::constants::{
    DEFAULT_BAUD_RATE, DEFAULT_PORT, DEFAULT_READ_TIMEOUT, DEFAULT_SESSION_TIMEOUT, DEFAULT_SHORT_READ_BACKOFF,
};

/// Serial line settings. The sensor always talks 8N1 without flow control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    /// Longest a single read may block before reporting zero bytes
    pub read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl SerialConfig {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Self::default()
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }
}

/// Bounds of one acquisition session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Overall deadline for obtaining a valid frame
    pub timeout: Duration,
    /// Pause before re-requesting the rest of a short read
    pub short_read_backoff: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_SESSION_TIMEOUT,
            short_read_backoff: DEFAULT_SHORT_READ_BACKOFF,
        }
    }
}

impl SessionConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_short_read_backoff(mut self, backoff: Duration) -> Self {
        self.short_read_backoff = backoff;
        self
    }
}
