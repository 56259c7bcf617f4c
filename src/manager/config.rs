//! Supervisor channel configuration

use std::net::SocketAddr;
use std::time::Duration;

/// Byte that tells this process to terminate
pub const DEFAULT_TERMINATION_MARKER: u8 = b'k';

/// Supervisor channel options
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Supervisor address
    pub addr: SocketAddr,

    /// Connection attempts before giving up for good
    pub connect_attempts: u32,

    /// Delay between connection attempts
    pub retry_delay: Duration,

    /// Read poll timeout of the listener
    pub poll_timeout: Duration,

    /// Byte that triggers an immediate halt
    pub termination_marker: u8,

    /// Delay before halting after the supervisor connection is lost
    pub loss_grace: Duration,

    /// Telemetry lines buffered before new ones are dropped
    pub telemetry_capacity: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 9999)),
            connect_attempts: 5,
            retry_delay: Duration::from_secs(1),
            poll_timeout: Duration::from_millis(100),
            termination_marker: DEFAULT_TERMINATION_MARKER,
            loss_grace: Duration::from_millis(200),
            telemetry_capacity: 64,
        }
    }
}

impl ManagerConfig {
    /// Create a new config with a custom supervisor address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            addr,
            ..Default::default()
        }
    }

    /// Set connection attempts and the delay between them
    pub fn retries(mut self, attempts: u32, delay: Duration) -> Self {
        self.connect_attempts = attempts.max(1);
        self.retry_delay = delay;
        self
    }

    /// Set the listener poll timeout
    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Set the termination marker byte
    pub fn termination_marker(mut self, marker: u8) -> Self {
        self.termination_marker = marker;
        self
    }

    /// Set the grace delay after connection loss
    pub fn loss_grace(mut self, grace: Duration) -> Self {
        self.loss_grace = grace;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ManagerConfig::default();

        assert!(config.addr.ip().is_loopback());
        assert_eq!(config.connect_attempts, 5);
        assert_eq!(config.termination_marker, b'k');
    }

    #[test]
    fn test_retries_at_least_one_attempt() {
        let config = ManagerConfig::default().retries(0, Duration::ZERO);

        assert_eq!(config.connect_attempts, 1);
    }
}
