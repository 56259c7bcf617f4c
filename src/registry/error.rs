//! Delivery error types

use std::fmt;

use super::entry::SubscriberId;

/// Why a payload could not be queued for a subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    /// Outbound queue is full (slow or stalled subscriber)
    Full(SubscriberId),
    /// Connection task has gone away
    Closed(SubscriberId),
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryError::Full(id) => write!(f, "Subscriber {} queue full", id),
            DeliveryError::Closed(id) => write!(f, "Subscriber {} closed", id),
        }
    }
}

impl std::error::Error for DeliveryError {}
