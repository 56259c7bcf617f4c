//! Supervisor control channel
//!
//! ```text
//! Disconnected ──connect()──► Connecting ──ok──► Connected
//!      ▲                          │                  │
//!      └──── attempts exhausted ──┘                  │
//!      └──── marker / EOF / read error / close() ────┘
//! ```
//!
//! The channel is authoritative for forced shutdown: a termination marker or
//! loss of the supervisor halts the process through [`crate::server::Halt`].

pub mod channel;
pub mod config;
pub mod protocol;

pub use channel::{LinkState, ManagerChannel, ManagerLink};
pub use config::{ManagerConfig, DEFAULT_TERMINATION_MARKER};
pub use protocol::inspect_read;
