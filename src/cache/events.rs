//! Change notifications for cache observers.

use super::entry::{CacheKey, Generation};
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Events emitted by a [`MutationCache`](super::MutationCache).
#[derive(Clone, Debug, PartialEq)]
pub enum CacheEvent {
    /// A value was written (fetch fill or optimistic projection).
    Written { key: CacheKey, generation: Generation },
    /// The entry went stale; observers should refetch it.
    Invalidated { key: CacheKey, generation: Generation },
    /// A rollback put a pre-mutation snapshot back.
    Restored { key: CacheKey, generation: Generation },
    /// Capacity pressure pushed the entry out.
    Evicted { key: CacheKey },
}

impl CacheEvent {
    pub fn key(&self) -> &CacheKey {
        match self {
            CacheEvent::Written { key, .. }
            | CacheEvent::Invalidated { key, .. }
            | CacheEvent::Restored { key, .. }
            | CacheEvent::Evicted { key } => key,
        }
    }
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Handle for receiving cache events.
pub struct CacheSubscription {
    pub id: SubscriptionId,
    pub receiver: Receiver<CacheEvent>,
}

impl CacheSubscription {
    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Option<CacheEvent> {
        self.receiver.try_recv().ok()
    }

    /// Receive with timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<CacheEvent> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Everything currently buffered.
    pub fn drain(&self) -> Vec<CacheEvent> {
        self.receiver.try_iter().collect()
    }
}

/// Fan-out of cache events to bounded subscriber channels.
///
/// A subscriber whose buffer is full is dropped rather than blocking the
/// cache.
pub(crate) struct EventHub {
    subscribers: RwLock<HashMap<SubscriptionId, Sender<CacheEvent>>>,
    next_id: AtomicU64,
    buffer_size: usize,
}

impl EventHub {
    pub(crate) fn new(buffer_size: usize) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            buffer_size: buffer_size.max(1),
        }
    }

    pub(crate) fn subscribe(&self) -> CacheSubscription {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(self.buffer_size);
        self.subscribers.write().insert(id, sender);
        CacheSubscription { id, receiver }
    }

    pub(crate) fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers.write().remove(&id);
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    pub(crate) fn publish(&self, events: Vec<CacheEvent>) {
        if events.is_empty() {
            return;
        }

        let mut to_remove = Vec::new();
        {
            let subs = self.subscribers.read();
            if subs.is_empty() {
                return;
            }
            for (id, sender) in subs.iter() {
                for event in &events {
                    if sender.try_send(event.clone()).is_err() {
                        to_remove.push(*id);
                        break;
                    }
                }
            }
        }

        if !to_remove.is_empty() {
            let mut subs = self.subscribers.write();
            for id in to_remove {
                subs.remove(&id);
                debug!(subscription = id.0, "dropped slow cache subscriber");
            }
        }
    }
}
