//! Subscriber registry and broadcast fan-out
//!
//! The registry is the only state shared between the producer thread and the
//! server's connection tasks.
//!
//! # Architecture
//!
//! ```text
//!                    Arc<ConnectionRegistry>
//!               ┌──────────────────────────────┐
//!               │ Mutex<HashMap<SubscriberId,  │
//!               │   Subscriber { tx: mpsc }    │
//!               │ >>                           │
//!               └──────────────┬───────────────┘
//!                              │
//!      ┌───────────────────────┼───────────────────────┐
//!      │                       │                       │
//!      ▼                       ▼                       ▼
//! [Producer]            [Connection task]       [Connection task]
//! broadcast()           rx.recv()               rx.recv()
//!   try_send ──────────► ws.send() ──► TCP      ws.send() ──► TCP
//! ```
//!
//! `bytes::Bytes` is reference counted, so every subscriber's queue holds the
//! same encoded frame allocation.

pub mod entry;
pub mod error;
pub mod frame;
pub mod store;

pub use entry::{Subscriber, SubscriberId};
pub use error::DeliveryError;
pub use frame::{BroadcastPayload, CloseReason, Outbound, PayloadKind};
pub use store::{BroadcastReport, ConnectionRegistry};
