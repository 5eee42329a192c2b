//! Volatile in-process backend.

use super::table::Table;
use super::{Assignment, CompositeKey, Item, KvBackend};
use crate::error::{StoreError, StoreResult};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// In-memory backend with fault injection for exercising failure paths.
pub struct MemoryBackend {
    table: RwLock<Table>,

    /// Number of upcoming calls that will fail.
    pending_failures: AtomicUsize,

    /// While set, every call fails.
    offline: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Table::new()),
            pending_failures: AtomicUsize::new(0),
            offline: AtomicBool::new(false),
        }
    }

    /// Make the next `n` calls fail with `StoreError::Unavailable`.
    pub fn fail_next(&self, n: usize) {
        self.pending_failures.store(n, Ordering::SeqCst);
    }

    /// Fail every call until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of stored items across all partitions.
    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("backend offline".into()));
        }
        let consumed = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if consumed.is_ok() {
            return Err(StoreError::Unavailable("injected failure".into()));
        }
        Ok(())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl KvBackend for MemoryBackend {
    fn put(&self, key: &CompositeKey, item: Item) -> StoreResult<()> {
        self.check_available()?;
        self.table.write().put(key, item);
        Ok(())
    }

    fn get(&self, key: &CompositeKey) -> StoreResult<Option<Item>> {
        self.check_available()?;
        Ok(self.table.read().get(key).cloned())
    }

    fn query(&self, partition: &str) -> StoreResult<Vec<Item>> {
        self.check_available()?;
        Ok(self.table.read().query(partition))
    }

    fn update(&self, key: &CompositeKey, assignments: &[Assignment]) -> StoreResult<Option<Item>> {
        self.check_available()?;
        let mut table = self.table.write();
        let updated = table.preview_update(key, assignments);
        if let Some(item) = &updated {
            table.put(key, item.clone());
        }
        Ok(updated)
    }

    fn delete(&self, key: &CompositeKey) -> StoreResult<Option<Item>> {
        self.check_available()?;
        Ok(self.table.write().remove(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(sort: &str) -> CompositeKey {
        CompositeKey {
            partition: "USER#u".to_string(),
            sort: sort.to_string(),
        }
    }

    #[test]
    fn test_put_get_query() {
        let backend = MemoryBackend::new();
        backend.put(&key("1"), Item::new()).unwrap();
        backend.put(&key("2"), Item::new()).unwrap();

        assert!(backend.get(&key("1")).unwrap().is_some());
        assert!(backend.get(&key("3")).unwrap().is_none());
        assert_eq!(backend.query("USER#u").unwrap().len(), 2);
        assert!(backend.query("USER#other").unwrap().is_empty());
    }

    #[test]
    fn test_update_requires_existing_item() {
        let backend = MemoryBackend::new();
        let assignments = vec![("status".to_string(), json!("Solved"))];

        assert!(backend
            .update(&key("1"), &assignments)
            .unwrap()
            .is_none());
        assert!(backend.is_empty());

        backend.put(&key("1"), Item::new()).unwrap();
        let updated = backend
            .update(&key("1"), &assignments)
            .unwrap()
            .unwrap();
        assert_eq!(updated["status"], "Solved");
    }

    #[test]
    fn test_fail_next() {
        let backend = MemoryBackend::new();
        backend.fail_next(2);

        assert!(matches!(backend.get(&key("1")), Err(StoreError::Unavailable(_))));
        assert!(matches!(backend.put(&key("1"), Item::new()), Err(StoreError::Unavailable(_))));
        assert!(backend.get(&key("1")).unwrap().is_none());
    }

    #[test]
    fn test_offline_leaves_table_untouched() {
        let backend = MemoryBackend::new();
        backend.put(&key("1"), Item::new()).unwrap();

        backend.set_offline(true);
        assert!(backend.delete(&key("1")).is_err());

        backend.set_offline(false);
        assert!(backend.get(&key("1")).unwrap().is_some());
    }
}
