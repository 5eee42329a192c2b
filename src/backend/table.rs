//! In-memory partitioned table shared by the backends.

use super::{Assignment, CompositeKey, Item};
use std::collections::{BTreeMap, HashMap};

/// Items grouped by partition, then by sort key.
#[derive(Default)]
pub(crate) struct Table {
    partitions: HashMap<String, BTreeMap<String, Item>>,
}

impl Table {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self, key: &CompositeKey) -> Option<&Item> {
        self.partitions.get(&key.partition)?.get(&key.sort)
    }

    pub(crate) fn put(&mut self, key: &CompositeKey, item: Item) {
        self.partitions
            .entry(key.partition.clone())
            .or_default()
            .insert(key.sort.clone(), item);
    }

    pub(crate) fn remove(&mut self, key: &CompositeKey) -> Option<Item> {
        let partition = self.partitions.get_mut(&key.partition)?;
        let removed = partition.remove(&key.sort);
        if partition.is_empty() {
            self.partitions.remove(&key.partition);
        }
        removed
    }

    pub(crate) fn query(&self, partition: &str) -> Vec<Item> {
        self.partitions
            .get(partition)
            .map(|items| items.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Compute the item an update would produce, without applying it.
    ///
    /// Returns `None` when nothing is stored under `key`.
    pub(crate) fn preview_update(&self, key: &CompositeKey, assignments: &[Assignment]) -> Option<Item> {
        let mut item = self.get(key)?.clone();
        for (field, value) in assignments {
            item.insert(field.clone(), value.clone());
        }
        Some(item)
    }

    /// Every `(key, item)` pair, for rewriting a journal.
    pub(crate) fn entries(&self) -> impl Iterator<Item = (CompositeKey, &Item)> + '_ {
        self.partitions.iter().flat_map(|(partition, items)| {
            items.iter().map(move |(sort, item)| {
                (
                    CompositeKey {
                        partition: partition.clone(),
                        sort: sort.clone(),
                    },
                    item,
                )
            })
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.partitions.values().map(BTreeMap::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(p: &str, s: &str) -> CompositeKey {
        CompositeKey {
            partition: p.to_string(),
            sort: s.to_string(),
        }
    }

    fn item(value: serde_json::Value) -> Item {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_preview_keeps_unassigned_fields() {
        let mut table = Table::new();
        table.put(&key("p", "s"), item(json!({"a": 1, "b": 2})));

        let preview = table
            .preview_update(&key("p", "s"), &[("b".into(), json!(3))])
            .unwrap();
        assert_eq!(preview["a"], 1);
        assert_eq!(preview["b"], 3);

        // Preview does not mutate.
        assert_eq!(table.get(&key("p", "s")).unwrap()["b"], 2);
    }

    #[test]
    fn test_preview_on_missing_item() {
        let table = Table::new();
        assert!(table
            .preview_update(&key("p", "s"), &[("a".into(), json!(1))])
            .is_none());
    }

    #[test]
    fn test_remove_drops_empty_partition() {
        let mut table = Table::new();
        table.put(&key("p", "s"), Item::new());
        assert_eq!(table.len(), 1);
        assert!(table.remove(&key("p", "s")).is_some());
        assert!(table.remove(&key("p", "s")).is_none());
        assert_eq!(table.len(), 0);
        assert!(table.query("p").is_empty());
    }
}
