use crate::core::{DbError, EntityKey, Result};
use crate::entity::Entity;
use crate::transaction::Change;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Committed records of the in-memory backend
///
/// Records are kept in their stored form (relations reduced to identifiers),
/// so every load hands out a new instance with nothing materialized.
pub struct MemoryStore {
    records: HashMap<EntityKey, Entity>,
    /// Loads served, for observing lazy-loading behaviour
    loads: AtomicU64,
    commits: u64,
    fail_commits: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            loads: AtomicU64::new(0),
            commits: 0,
            fail_commits: false,
        }
    }

    /// Load a record, counting the access
    pub fn load(&self, key: &EntityKey) -> Option<Entity> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.records.get(key).cloned()
    }

    /// Existence check that does not count as a load
    pub fn contains(&self, key: &EntityKey) -> bool {
        self.records.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn commit_count(&self) -> u64 {
        self.commits
    }

    /// Make every following commit fail, as a lost connection would
    pub fn set_fail_commits(&mut self, fail: bool) {
        self.fail_commits = fail;
    }

    /// Apply a transaction's changes atomically
    pub fn apply(&mut self, changes: Vec<Change>) -> Result<()> {
        if self.fail_commits {
            return Err(DbError::StorageError("commit rejected by storage".into()));
        }

        for change in changes {
            match change {
                Change::Save(entity) => {
                    self.records.insert(entity.key(), entity.unloaded());
                }
                Change::Delete(key) => {
                    self.records.remove(&key);
                }
            }
        }
        self.commits += 1;
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Bundle, Item};
    use std::sync::Arc;

    #[test]
    fn test_apply_and_load() {
        let mut store = MemoryStore::new();
        let item: Entity = Arc::new(Item::new("Thesis")).into();
        let key = item.key();

        store.apply(vec![Change::Save(item)]).unwrap();
        assert!(store.contains(&key));
        assert_eq!(store.load_count(), 0);

        let loaded = store.load(&key).unwrap();
        assert_eq!(loaded.key(), key);
        assert_eq!(store.load_count(), 1);
        assert_eq!(store.commit_count(), 1);
    }

    #[test]
    fn test_records_are_stored_unloaded() {
        let mut store = MemoryStore::new();
        let item = Arc::new(Item::new("Thesis").with_bundles(vec![Arc::new(Bundle::new("ORIGINAL"))]));
        let key = Entity::from(Arc::clone(&item)).key();
        store.apply(vec![Change::Save(item.into())]).unwrap();

        let Some(Entity::Item(loaded)) = store.load(&key) else {
            panic!("expected an item");
        };
        assert!(!loaded.bundles.is_initialized());
    }

    #[test]
    fn test_delete() {
        let mut store = MemoryStore::new();
        let item: Entity = Arc::new(Item::new("Thesis")).into();
        let key = item.key();
        store.apply(vec![Change::Save(item)]).unwrap();
        store.apply(vec![Change::Delete(key)]).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_failed_commit_applies_nothing() {
        let mut store = MemoryStore::new();
        store.set_fail_commits(true);
        let item: Entity = Arc::new(Item::new("Thesis")).into();

        let result = store.apply(vec![Change::Save(item)]);
        assert!(matches!(result, Err(DbError::StorageError(_))));
        assert!(store.is_empty());
        assert_eq!(store.commit_count(), 0);
    }
}
