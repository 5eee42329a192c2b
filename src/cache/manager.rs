//! Generation-stamped client cache.

use super::entry::{CacheEntry, CacheKey, CachedValue, EntrySnapshot, Generation};
use super::events::{CacheEvent, CacheSubscription, EventHub, SubscriptionId};
use crate::types::OwnerId;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use tracing::{debug, trace};

/// Cache configuration.
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// Maximum number of entries before least-recently-used eviction.
    pub capacity: usize,

    /// Buffered events per subscriber before it is dropped.
    pub event_buffer: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            event_buffer: 1024,
        }
    }
}

struct CacheInner {
    entries: LruCache<CacheKey, CacheEntry>,
    /// Last generation handed out.
    clock: Generation,
}

impl CacheInner {
    fn tick(&mut self) -> Generation {
        self.clock = self.clock.next();
        self.clock
    }

    fn current(&self, key: &CacheKey) -> Option<Generation> {
        self.entries.peek(key).map(|e| e.generation)
    }

    /// Store an entry at a fresh generation, reporting any eviction.
    fn store(&mut self, key: CacheKey, value: CachedValue, stale: bool, events: &mut Vec<CacheEvent>) -> Generation {
        let generation = self.tick();
        let entry = CacheEntry {
            value,
            generation,
            stale,
        };
        if let Some((evicted, _)) = self.entries.push(key.clone(), entry) {
            if evicted != key {
                events.push(CacheEvent::Evicted { key: evicted });
            }
        }
        generation
    }

    fn mark_stale(&mut self, key: &CacheKey) -> Option<Generation> {
        let generation = self.clock.next();
        let entry = self.entries.peek_mut(key)?;
        entry.stale = true;
        entry.generation = generation;
        self.clock = generation;
        Some(generation)
    }
}

/// Keyed cache of fetched trackers with per-entry generations.
///
/// Every mutation of an entry (write, invalidation, restore) stamps it with
/// a fresh generation from a single counter, all under one lock. Callers
/// that act on a value read earlier use the generation to detect that a
/// newer write has landed in between.
///
/// Events are published before the lock is released, so every subscriber
/// sees them in generation order. Publishing never blocks: a full
/// subscriber is dropped.
pub struct MutationCache {
    inner: Mutex<CacheInner>,
    events: EventHub,
}

impl MutationCache {
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(CacheInner {
                entries: LruCache::new(capacity),
                clock: Generation::default(),
            }),
            events: EventHub::new(config.event_buffer),
        }
    }

    /// Current value, or `None` when absent or stale (the caller should fetch).
    pub fn read(&self, key: &CacheKey) -> Option<CachedValue> {
        let mut inner = self.inner.lock();
        match inner.entries.get(key) {
            Some(entry) if !entry.stale => Some(entry.value.clone()),
            _ => None,
        }
    }

    /// Replace the value unconditionally.
    pub fn write(&self, key: CacheKey, value: CachedValue) -> Generation {
        let mut events = Vec::new();
        let mut inner = self.inner.lock();
        let generation = inner.store(key.clone(), value, false, &mut events);
        events.push(CacheEvent::Written { key, generation });
        self.events.publish(events);
        generation
    }

    /// Replace the value only if the entry is still at `expected`.
    ///
    /// `expected = None` means "only if absent". Used by fetches, so a
    /// response that was requested before a newer write cannot clobber it.
    pub fn write_if(
        &self,
        key: CacheKey,
        value: CachedValue,
        expected: Option<Generation>,
    ) -> Option<Generation> {
        let mut inner = self.inner.lock();
        let current = inner.current(&key);
        if current != expected {
            trace!(%key, ?current, ?expected, "conditional write lost to newer generation");
            return None;
        }
        let mut events = Vec::new();
        let generation = inner.store(key.clone(), value, false, &mut events);
        events.push(CacheEvent::Written { key, generation });
        self.events.publish(events);
        Some(generation)
    }

    /// Mark the entry stale so the next `read` misses. `None` if absent.
    pub fn invalidate(&self, key: &CacheKey) -> Option<Generation> {
        let mut inner = self.inner.lock();
        let generation = inner.mark_stale(key);
        if let Some(generation) = generation {
            debug!(%key, %generation, "invalidated cache entry");
            self.events.publish(vec![CacheEvent::Invalidated {
                key: key.clone(),
                generation,
            }]);
        }
        generation
    }

    /// Invalidate the owner's list and every cached tracker they own.
    pub fn invalidate_owner(&self, owner: &OwnerId) -> usize {
        let mut inner = self.inner.lock();
        let keys: Vec<CacheKey> = inner
            .entries
            .iter()
            .filter(|(key, entry)| match (key, &entry.value) {
                (CacheKey::List(list_owner), _) => list_owner == owner,
                (CacheKey::Detail(_), CachedValue::Detail(tracker)) => &tracker.owner_id == owner,
                _ => false,
            })
            .map(|(key, _)| key.clone())
            .collect();

        let mut events = Vec::new();
        for key in keys {
            if let Some(generation) = inner.mark_stale(&key) {
                events.push(CacheEvent::Invalidated { key, generation });
            }
        }
        let count = events.len();
        self.events.publish(events);
        count
    }

    /// Generation of the entry, stale or not. Does not touch recency.
    pub fn generation(&self, key: &CacheKey) -> Option<Generation> {
        self.inner.lock().current(key)
    }

    /// Copy of the entry, stale or not. Does not touch recency.
    pub fn snapshot(&self, key: &CacheKey) -> Option<EntrySnapshot> {
        self.inner.lock().entries.peek(key).map(EntrySnapshot::from)
    }

    /// Atomically either put `snapshot` back or invalidate the entry.
    ///
    /// `should_restore` sees the entry's current generation (`None` if it is
    /// gone) and decides. Returns what was done: `true` for a restore.
    pub fn restore_or_invalidate<F>(&self, key: &CacheKey, snapshot: &EntrySnapshot, should_restore: F) -> bool
    where
        F: FnOnce(Option<Generation>) -> bool,
    {
        let mut events = Vec::new();
        let mut inner = self.inner.lock();
        let current = inner.current(key);
        let restored = if should_restore(current) {
            let generation = inner.store(key.clone(), snapshot.value.clone(), snapshot.stale, &mut events);
            events.push(CacheEvent::Restored {
                key: key.clone(),
                generation,
            });
            true
        } else {
            if let Some(generation) = inner.mark_stale(key) {
                events.push(CacheEvent::Invalidated {
                    key: key.clone(),
                    generation,
                });
            }
            false
        };
        self.events.publish(events);
        restored
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.inner.lock().entries.contains(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. The generation counter keeps counting.
    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    pub fn subscribe(&self) -> CacheSubscription {
        self.events.subscribe()
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.events.unsubscribe(id);
    }

    /// Live subscriptions; ones dropped for lagging are not counted.
    pub fn subscriber_count(&self) -> usize {
        self.events.subscriber_count()
    }
}

impl Default for MutationCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
