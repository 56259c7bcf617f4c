//! Error types
//!
//! One error type for the whole crate. The designed process-ending paths
//! (termination marker, supervisor loss, OS signals) are not errors; see
//! [`crate::server::Halt`].

use std::fmt;
use std::io;
use std::net::SocketAddr;

use tokio_tungstenite::tungstenite;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Crate error type
#[derive(Debug)]
pub enum Error {
    /// Socket or thread I/O failure
    Io(io::Error),
    /// WebSocket transport failure
    WebSocket(tungstenite::Error),
    /// Telemetry serialization failure
    Json(serde_json::Error),
    /// Invalid configuration value
    Config(String),
    /// The listen sequence ran out of retries
    BindExhausted {
        addr: SocketAddr,
        attempts: u32,
        last: io::Error,
    },
    /// Frame source failure
    Source(String),
    /// Detector failure
    Detector(String),
    /// Encoder failure
    Encoder(String),
    /// `start` was called on a server that is not in the `Created` state
    AlreadyStarted,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::WebSocket(e) => write!(f, "WebSocket error: {}", e),
            Error::Json(e) => write!(f, "JSON error: {}", e),
            Error::Config(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::BindExhausted {
                addr,
                attempts,
                last,
            } => write!(
                f,
                "Failed to listen on {} after {} attempts: {}",
                addr, attempts, last
            ),
            Error::Source(msg) => write!(f, "Frame source error: {}", msg),
            Error::Detector(msg) => write!(f, "Detector error: {}", msg),
            Error::Encoder(msg) => write!(f, "Encoder error: {}", msg),
            Error::AlreadyStarted => write!(f, "Server already started"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::WebSocket(e) => Some(e),
            Error::Json(e) => Some(e),
            Error::BindExhausted { last, .. } => Some(last),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<tungstenite::Error> for Error {
    fn from(e: tungstenite::Error) -> Self {
        Error::WebSocket(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_exhausted_display() {
        let err = Error::BindExhausted {
            addr: "127.0.0.1:5555".parse().unwrap(),
            attempts: 4,
            last: io::Error::new(io::ErrorKind::AddrInUse, "in use"),
        };

        let text = err.to_string();
        assert!(text.contains("127.0.0.1:5555"));
        assert!(text.contains("4 attempts"));
    }

    #[test]
    fn test_io_conversion_keeps_source() {
        let err: Error = io::Error::new(io::ErrorKind::Other, "boom").into();
        assert!(std::error::Error::source(&err).is_some());
    }
}
