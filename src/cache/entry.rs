//! Cache keys, values and generation stamps.

use crate::types::{OwnerId, Tracker, TrackerId};
use std::fmt;

/// Monotonic version stamp for cache writes.
///
/// One counter is shared by every key in a cache, so a generation is never
/// reused even after its entry is evicted and re-created.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

impl fmt::Debug for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Gen({})", self.0)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a cache entry holds.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// The owner's full tracker list.
    List(OwnerId),
    /// One tracker.
    Detail(TrackerId),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::List(owner) => write!(f, "trackers/list/{}", owner),
            CacheKey::Detail(id) => write!(f, "trackers/detail/{}", id),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CachedValue {
    List(Vec<Tracker>),
    Detail(Tracker),
}

impl CachedValue {
    pub fn as_list(&self) -> Option<&[Tracker]> {
        match self {
            CachedValue::List(items) => Some(items),
            CachedValue::Detail(_) => None,
        }
    }

    pub fn as_detail(&self) -> Option<&Tracker> {
        match self {
            CachedValue::Detail(tracker) => Some(tracker),
            CachedValue::List(_) => None,
        }
    }

    pub fn into_list(self) -> Option<Vec<Tracker>> {
        match self {
            CachedValue::List(items) => Some(items),
            CachedValue::Detail(_) => None,
        }
    }

    pub fn into_detail(self) -> Option<Tracker> {
        match self {
            CachedValue::Detail(tracker) => Some(tracker),
            CachedValue::List(_) => None,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct CacheEntry {
    pub(crate) value: CachedValue,
    pub(crate) generation: Generation,
    /// Set by invalidation; a stale entry is never served by `read`.
    pub(crate) stale: bool,
}

/// Copy of an entry taken before an optimistic write, for rollback.
#[derive(Clone, Debug, PartialEq)]
pub struct EntrySnapshot {
    pub value: CachedValue,
    pub stale: bool,
    pub generation: Generation,
}

impl From<&CacheEntry> for EntrySnapshot {
    fn from(entry: &CacheEntry) -> Self {
        Self {
            value: entry.value.clone(),
            stale: entry.stale,
            generation: entry.generation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_ordering() {
        let g = Generation(4);
        assert_eq!(g.next(), Generation(5));
        assert!(g.next() > g);
    }

    #[test]
    fn test_key_display() {
        assert_eq!(CacheKey::List(OwnerId::from("u")).to_string(), "trackers/list/u");
        assert_eq!(
            CacheKey::Detail(TrackerId::from("t")).to_string(),
            "trackers/detail/t"
        );
    }

    #[test]
    fn test_value_accessors() {
        let list = CachedValue::List(Vec::new());
        assert!(list.as_list().is_some());
        assert!(list.as_detail().is_none());
        assert!(list.into_detail().is_none());
    }
}
