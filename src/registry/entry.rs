//! Subscriber handles
//!
//! A subscriber is the producer-side end of one connection: a bounded queue
//! drained by that connection's task. Identity is the registry-assigned id,
//! never the content.

use std::fmt;
use std::net::SocketAddr;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::error::DeliveryError;
use super::frame::{BroadcastPayload, Outbound};

/// Registry-assigned subscriber identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to one open subscriber connection
#[derive(Debug, Clone)]
pub struct Subscriber {
    id: SubscriberId,
    peer_addr: SocketAddr,
    tx: mpsc::Sender<Outbound>,
}

impl Subscriber {
    pub fn new(id: SubscriberId, peer_addr: SocketAddr, tx: mpsc::Sender<Outbound>) -> Self {
        Self { id, peer_addr, tx }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    fn delivery_error<T>(&self, e: TrySendError<T>) -> DeliveryError {
        match e {
            TrySendError::Full(_) => DeliveryError::Full(self.id),
            TrySendError::Closed(_) => DeliveryError::Closed(self.id),
        }
    }

    /// Queue an item without waiting
    pub(super) fn try_deliver(&self, item: Outbound) -> Result<(), DeliveryError> {
        self.tx.try_send(item).map_err(|e| self.delivery_error(e))
    }

    /// Queue every payload of one tick, or none of them.
    ///
    /// Slots for the whole tick are reserved up front, so a text message is
    /// never queued without the binary frame that follows it.
    pub(super) fn try_deliver_tick(
        &self,
        payloads: &[BroadcastPayload],
    ) -> Result<(), DeliveryError> {
        if payloads.is_empty() {
            return Ok(());
        }

        let permits = self
            .tx
            .try_reserve_many(payloads.len())
            .map_err(|e| self.delivery_error(e))?;
        for (permit, payload) in permits.zip(payloads) {
            permit.send(Outbound::Payload(payload.clone()));
        }
        Ok(())
    }
}
