//! Broadcast payload types
//!
//! Each tick produces an ordered list of payloads that go to every
//! subscriber in the same order.

use bytes::Bytes;

/// Kind of message a payload is sent as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// UTF-8 text message
    Text,
    /// Binary message
    Binary,
}

/// One message to be broadcast to subscribers
///
/// This is designed to be cheap to clone due to `Bytes` reference counting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastPayload {
    pub kind: PayloadKind,
    pub data: Bytes,
}

impl BroadcastPayload {
    /// Text payload
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: PayloadKind::Text,
            data: Bytes::from(text.into()),
        }
    }

    /// Binary payload
    pub fn binary(data: Bytes) -> Self {
        Self {
            kind: PayloadKind::Binary,
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Close status sent to subscribers when the server drops them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Server is shutting down
    GoingAway,
    /// Orderly close
    Normal,
}

impl CloseReason {
    /// WebSocket close code
    pub fn code(self) -> u16 {
        match self {
            CloseReason::GoingAway => 1001,
            CloseReason::Normal => 1000,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            CloseReason::GoingAway => "Server shutting down",
            CloseReason::Normal => "Closed",
        }
    }
}

/// Item queued for a subscriber's connection task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Payload(BroadcastPayload),
    Close(CloseReason),
}
