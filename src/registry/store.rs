//! Connection registry implementation
//!
//! The set of live subscribers, shared between the producer thread
//! (broadcast) and the server's connection tasks (add/remove).

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use super::entry::{Subscriber, SubscriberId};
use super::frame::{BroadcastPayload, CloseReason, Outbound};

/// Outcome of one broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Subscribers that had the tick queued
    pub delivered: usize,
    /// Subscribers that missed the tick
    pub failed: usize,
}

struct Members {
    subscribers: HashMap<SubscriberId, Subscriber>,
    closed: bool,
}

/// Thread-safe registry of active subscribers
///
/// Every operation goes through one mutex. Delivery only enqueues into each
/// subscriber's bounded queue, so the lock is never held across socket I/O
/// and a stalled subscriber cannot hold up the others.
pub struct ConnectionRegistry {
    members: Mutex<Members>,
    next_id: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            members: Mutex::new(Members {
                subscribers: HashMap::new(),
                closed: false,
            }),
            next_id: AtomicU64::new(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Members> {
        self.members.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_id(&self) -> SubscriberId {
        SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Create a subscriber with a fresh id and a queue of `capacity` items,
    /// and add it.
    ///
    /// Returns `None` once the registry has been closed.
    pub fn register(
        &self,
        peer_addr: SocketAddr,
        capacity: usize,
    ) -> Option<(SubscriberId, mpsc::Receiver<Outbound>)> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let id = self.next_id();
        if self.add(Subscriber::new(id, peer_addr, tx)) {
            Some((id, rx))
        } else {
            None
        }
    }

    /// Add a subscriber. Returns `false` if the registry is closed.
    pub fn add(&self, subscriber: Subscriber) -> bool {
        let mut members = self.lock();
        if members.closed {
            tracing::debug!(subscriber = %subscriber.id(), "Registry closed, subscriber refused");
            return false;
        }

        let id = subscriber.id();
        let peer = subscriber.peer_addr();
        members.subscribers.insert(id, subscriber);

        tracing::info!(
            subscriber = %id,
            peer = %peer,
            total = members.subscribers.len(),
            "Client connected"
        );
        true
    }

    /// Remove a subscriber. Returns whether it was present.
    pub fn remove(&self, id: SubscriberId) -> bool {
        let mut members = self.lock();
        let removed = members.subscribers.remove(&id).is_some();

        if removed {
            tracing::info!(
                subscriber = %id,
                total = members.subscribers.len(),
                "Client disconnected"
            );
        }
        removed
    }

    /// Queue `payloads`, in order, for every subscriber.
    ///
    /// Each subscriber gets the whole tick or none of it. A subscriber without
    /// room is logged and misses this tick; it stays registered until its
    /// connection closes.
    pub fn broadcast(&self, payloads: &[BroadcastPayload]) -> BroadcastReport {
        let members = self.lock();
        let mut report = BroadcastReport::default();

        for subscriber in members.subscribers.values() {
            match subscriber.try_deliver_tick(payloads) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        subscriber = %subscriber.id(),
                        peer = %subscriber.peer_addr(),
                        error = %e,
                        "Send error"
                    );
                }
            }
        }

        report
    }

    /// Send a close to every subscriber, empty the registry and refuse
    /// further additions. Returns the number of subscribers closed.
    pub fn close_all(&self, reason: CloseReason) -> usize {
        let mut members = self.lock();
        members.closed = true;

        let count = members.subscribers.len();
        for (id, subscriber) in members.subscribers.drain() {
            if let Err(e) = subscriber.try_deliver(Outbound::Close(reason)) {
                // Dropping the handle still ends the connection task
                tracing::debug!(subscriber = %id, error = %e, "Close not queued");
            }
        }

        if count > 0 {
            tracing::info!(count = count, code = reason.code(), "Closed all subscribers");
        }
        count
    }

    pub fn len(&self) -> usize {
        self.lock().subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.lock().subscribers.contains_key(&id)
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
