//! Client-side cache of trackers.
//!
//! Entries are keyed by the owner's list or a single tracker id and carry a
//! generation stamp. The cache is an explicit instance (usually behind an
//! `Arc`) so independent caches can coexist.
//!
//! Observers can subscribe to change events, e.g. to refetch on
//! invalidation:
//!
//! ```ignore
//! let cache = Arc::new(MutationCache::default());
//! let events = cache.subscribe();
//!
//! while let Some(event) = events.recv_timeout(Duration::from_secs(1)) {
//!     if let CacheEvent::Invalidated { key, .. } = event {
//!         refetch(&key);
//!     }
//! }
//! ```

mod entry;
mod events;
mod manager;

pub use entry::{CacheKey, CachedValue, EntrySnapshot, Generation};
pub use events::{CacheEvent, CacheSubscription, SubscriptionId};
pub use manager::{CacheConfig, MutationCache};
