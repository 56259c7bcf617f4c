//! Broadcast server and lifecycle
//!
//! [`BroadcastServer`] owns the accept loop and the subscriber registry;
//! [`StreamServer`] wraps it with the producer thread, the supervisor
//! channel and idempotent shutdown; [`signal`] hooks OS signals into that
//! shutdown; [`Halt`] is the terminal action for designed process exits.

pub mod bind;
pub mod config;
pub(crate) mod connection;
pub mod halt;
pub mod identity;
pub mod lifecycle;
pub mod listener;
pub mod signal;

pub use config::{ServerConfig, DEFAULT_PORT};
pub use halt::{Halt, HaltReason, ProcessExit, RecordedHalt};
pub use identity::{StreamIdentity, PATH_PREFIX};
pub use lifecycle::{LifecycleState, StreamServer};
pub use listener::BroadcastServer;
