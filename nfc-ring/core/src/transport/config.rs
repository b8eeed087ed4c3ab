//! Transport Configuration
//!
//! Where the ring daemon listens and how long the client waits on it.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default daemon address
pub const DEFAULT_DAEMON_ADDR: &str = "127.0.0.1:8080";

/// Default connection timeout in milliseconds
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;

/// Default read timeout in milliseconds
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;

/// Default pause between acquisition polls in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Transport configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Daemon address (`host:port`)
    pub daemon_addr: String,

    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,

    /// How long one read blocks before reporting "no data"
    ///
    /// This is also the worst-case delay before a cancelled token
    /// acquisition notices the cancellation.
    pub read_timeout_ms: u64,

    /// Sleep between empty polls while waiting for a new token
    pub poll_interval_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            daemon_addr: DEFAULT_DAEMON_ADDR.to_string(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl TransportConfig {
    /// Connection timeout
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Read timeout
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Acquisition poll interval
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
