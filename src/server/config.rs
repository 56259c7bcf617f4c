//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

/// Default listening port
pub const DEFAULT_PORT: u16 = 5555;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Explicit stream identity (random if `None`)
    pub stream_identity: Option<String>,

    /// Listen attempts after the first before giving up
    pub bind_retries: u32,

    /// Delay between listen attempts
    pub bind_backoff: Duration,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// WebSocket handshake must complete within this time
    pub handshake_timeout: Duration,

    /// Outbound messages buffered per subscriber before frames are dropped
    pub subscriber_queue: usize,

    /// Send a JSON telemetry text message before each binary frame
    pub send_metadata: bool,

    /// Time given to in-flight sends after subscribers are closed
    pub shutdown_grace: Duration,

    /// Delay between a termination signal's cleanup and the forced exit
    pub force_exit_delay: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            stream_identity: None,
            bind_retries: 3,
            bind_backoff: Duration::from_secs(2),
            tcp_nodelay: true, // Important for low latency
            handshake_timeout: Duration::from_secs(10),
            subscriber_queue: 4,
            send_metadata: true,
            shutdown_grace: Duration::from_millis(250),
            force_exit_delay: Duration::from_secs(1),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the listening port, keeping the bind IP
    pub fn port(mut self, port: u16) -> Self {
        self.bind_addr.set_port(port);
        self
    }

    /// Use a fixed stream identity
    pub fn stream_identity(mut self, identity: impl Into<String>) -> Self {
        self.stream_identity = Some(identity.into());
        self
    }

    /// Set listen retry count and backoff
    pub fn bind_retry(mut self, retries: u32, backoff: Duration) -> Self {
        self.bind_retries = retries;
        self.bind_backoff = backoff;
        self
    }

    /// Set the handshake timeout
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Set the per-subscriber queue length. At least one full tick (text
    /// plus binary) always fits.
    pub fn subscriber_queue(mut self, len: usize) -> Self {
        self.subscriber_queue = len.max(2);
        self
    }

    /// Send binary frames only (legacy protocol)
    pub fn binary_only(mut self) -> Self {
        self.send_metadata = false;
        self
    }

    /// Set the shutdown grace delay
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Set the forced exit delay after a termination signal
    pub fn force_exit_delay(mut self, delay: Duration) -> Self {
        self.force_exit_delay = delay;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), DEFAULT_PORT);
        assert!(config.stream_identity.is_none());
        assert_eq!(config.bind_retries, 3);
        assert!(config.tcp_nodelay);
        assert!(config.send_metadata);
        assert_eq!(config.handshake_timeout, Duration::from_secs(10));
        assert_eq!(config.subscriber_queue, 4);
    }

    #[test]
    fn test_builder_handshake_timeout() {
        let config = ServerConfig::default().handshake_timeout(Duration::from_millis(500));

        assert_eq!(config.handshake_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:5556".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.bind_addr.port(), 5556);
    }

    #[test]
    fn test_builder_port_keeps_ip() {
        let config = ServerConfig::with_addr("127.0.0.1:1".parse().unwrap()).port(8080);

        assert_eq!(config.bind_addr, "127.0.0.1:8080".parse().unwrap());
    }

    #[test]
    fn test_builder_subscriber_queue_holds_a_tick() {
        let config = ServerConfig::default().subscriber_queue(1);

        assert_eq!(config.subscriber_queue, 2);
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:6000".parse().unwrap();
        let config = ServerConfig::default()
            .bind(addr)
            .stream_identity("lobby")
            .bind_retry(5, Duration::from_millis(100))
            .binary_only()
            .shutdown_grace(Duration::ZERO)
            .force_exit_delay(Duration::from_millis(10));

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.stream_identity.as_deref(), Some("lobby"));
        assert_eq!(config.bind_retries, 5);
        assert_eq!(config.bind_backoff, Duration::from_millis(100));
        assert!(!config.send_metadata);
        assert_eq!(config.shutdown_grace, Duration::ZERO);
        assert_eq!(config.force_exit_delay, Duration::from_millis(10));
    }
}
