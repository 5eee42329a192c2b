//! Composite-key storage boundary.
//!
//! Backends hold JSON documents addressed by `(partition, sort)` keys and
//! support partial updates of existing items. They know nothing about trackers;
//! the record store adapter does the translation.
//!
//! # Example
//!
//! ```ignore
//! let backend = MemoryBackend::new();
//! let key = CompositeKey::tracker(&owner, &tracker_id);
//!
//! backend.put(&key, item)?;
//! let updated = backend.update(&key, &assignments)?;
//! ```

mod journal;
mod memory;
mod table;

pub use journal::{JournalBackend, JournalConfig};
pub use memory::MemoryBackend;

use crate::error::StoreResult;
use crate::types::{OwnerId, TrackerId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A stored document.
pub type Item = serde_json::Map<String, serde_json::Value>;

/// One `field = value` clause of a partial update.
pub type Assignment = (String, serde_json::Value);

/// Storage key: owner partition plus entity sort key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompositeKey {
    pub partition: String,
    pub sort: String,
}

impl CompositeKey {
    /// Key of one tracker inside its owner's partition.
    pub fn tracker(owner: &OwnerId, tracker_id: &TrackerId) -> Self {
        Self {
            partition: Self::owner_partition(owner),
            sort: format!("TRACK#{}", tracker_id),
        }
    }

    /// Partition holding every tracker of `owner`.
    pub fn owner_partition(owner: &OwnerId) -> String {
        format!("USER#{}", owner)
    }
}

impl fmt::Debug for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.partition, self.sort)
    }
}

/// Opaque composite-key store.
///
/// Every method either fully applies or leaves the store untouched.
pub trait KvBackend: Send + Sync {
    /// Write `item` under `key`, replacing anything stored there.
    fn put(&self, key: &CompositeKey, item: Item) -> StoreResult<()>;

    fn get(&self, key: &CompositeKey) -> StoreResult<Option<Item>>;

    /// Every item in `partition`. Order is unspecified.
    fn query(&self, partition: &str) -> StoreResult<Vec<Item>>;

    /// Set the given fields on the stored item, leaving all others as stored.
    ///
    /// Returns the post-update item, or `None` (writing nothing) when no
    /// item is stored under `key`.
    fn update(&self, key: &CompositeKey, assignments: &[Assignment]) -> StoreResult<Option<Item>>;

    /// Remove the item, returning what was stored (if anything).
    fn delete(&self, key: &CompositeKey) -> StoreResult<Option<Item>>;
}

impl<B: KvBackend + ?Sized> KvBackend for Arc<B> {
    fn put(&self, key: &CompositeKey, item: Item) -> StoreResult<()> {
        (**self).put(key, item)
    }

    fn get(&self, key: &CompositeKey) -> StoreResult<Option<Item>> {
        (**self).get(key)
    }

    fn query(&self, partition: &str) -> StoreResult<Vec<Item>> {
        (**self).query(partition)
    }

    fn update(&self, key: &CompositeKey, assignments: &[Assignment]) -> StoreResult<Option<Item>> {
        (**self).update(key, assignments)
    }

    fn delete(&self, key: &CompositeKey) -> StoreResult<Option<Item>> {
        (**self).delete(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_key_format() {
        let key = CompositeKey::tracker(&OwnerId::from("abc"), &TrackerId::from("123"));
        assert_eq!(key.partition, "USER#abc");
        assert_eq!(key.sort, "TRACK#123");
        assert_eq!(format!("{:?}", key), "USER#abc/TRACK#123");
    }

    #[test]
    fn test_partitions_differ_per_owner() {
        let id = TrackerId::from("same");
        let a = CompositeKey::tracker(&OwnerId::from("a"), &id);
        let b = CompositeKey::tracker(&OwnerId::from("b"), &id);
        assert_ne!(a, b);
    }
}
