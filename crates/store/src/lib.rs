//! ResourceStore: the in-memory entity collection backing the optimistic view
//!
//! The store is the single source of truth for what the UI displays.
//! The mutation coordinator is its only writer; readers may snapshot it
//! concurrently at any time.
//!
//! ## Invariants
//!
//! 1. **Unique ids**: at every observable instant no two entries share an
//!    id. `insert` refuses duplicates instead of silently shadowing.
//! 2. **Atomic swap**: replacing a provisional entity with its committed
//!    server form is a single `replace` under the write lock. Observers
//!    can never see an intermediate remove+insert.
//! 3. **Stable order**: insertion order is preserved, and `remove`
//!    reports the vacated position so an undo can restore the entry
//!    exactly where it was.

#![warn(missing_docs)]
#![warn(clippy::all)]

use greenroom_core::{EntityId, EventRecord};
use parking_lot::RwLock;
use tracing::warn;

/// Ordered in-memory collection of managed records
///
/// Interior locking keeps reads cheap (`RwLock` read guard) while writes
/// stay exclusive. All mutation goes through the coordinator, so writer
/// contention does not occur in practice; the lock is what makes the
/// uniqueness and atomic-swap invariants observable facts rather than
/// conventions.
#[derive(Debug, Default)]
pub struct ResourceStore {
    entries: RwLock<Vec<EventRecord>>,
}

impl ResourceStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entity
    ///
    /// Returns `false` (and leaves the store untouched) if an entry with
    /// the same id already exists.
    pub fn insert(&self, entity: EventRecord) -> bool {
        let mut entries = self.entries.write();
        if entries.iter().any(|e| e.id == entity.id) {
            warn!(target: "greenroom::store", id = %entity.id, "insert rejected: duplicate id");
            return false;
        }
        entries.push(entity);
        true
    }

    /// Insert an entity at `index` (clamped to the current length)
    ///
    /// Used to reverse a delete: the snapshot goes back to the exact
    /// position it was removed from. Duplicate ids are rejected like
    /// [`insert`](Self::insert).
    pub fn insert_at(&self, index: usize, entity: EventRecord) -> bool {
        let mut entries = self.entries.write();
        if entries.iter().any(|e| e.id == entity.id) {
            warn!(target: "greenroom::store", id = %entity.id, "insert_at rejected: duplicate id");
            return false;
        }
        let index = index.min(entries.len());
        entries.insert(index, entity);
        true
    }

    /// Replace the entity identified by `id` with `entity`, atomically
    ///
    /// The replacement may carry a different id (the provisional→server
    /// swap of a committed create); position is preserved. Returns `false`
    /// if `id` is not present, or if the replacement id would collide with
    /// another existing entry.
    pub fn replace(&self, id: EntityId, entity: EventRecord) -> bool {
        let mut entries = self.entries.write();
        let Some(index) = entries.iter().position(|e| e.id == id) else {
            return false;
        };
        if entity.id != id && entries.iter().any(|e| e.id == entity.id) {
            warn!(
                target: "greenroom::store",
                old = %id,
                new = %entity.id,
                "replace rejected: replacement id already present"
            );
            return false;
        }
        entries[index] = entity;
        true
    }

    /// Remove the entity identified by `id`
    ///
    /// Returns the vacated position together with the removed entity so
    /// the caller can restore it exactly on undo.
    pub fn remove(&self, id: EntityId) -> Option<(usize, EventRecord)> {
        let mut entries = self.entries.write();
        let index = entries.iter().position(|e| e.id == id)?;
        Some((index, entries.remove(index)))
    }

    /// Replace the whole collection (reconciliation / full reload)
    ///
    /// Server responses are trusted to be duplicate-free; if one is not,
    /// later duplicates are dropped with a warning so the uniqueness
    /// invariant survives.
    pub fn replace_all(&self, entities: Vec<EventRecord>) {
        let mut deduped: Vec<EventRecord> = Vec::with_capacity(entities.len());
        for entity in entities {
            if deduped.iter().any(|e| e.id == entity.id) {
                warn!(target: "greenroom::store", id = %entity.id, "replace_all dropped duplicate id");
                continue;
            }
            deduped.push(entity);
        }
        *self.entries.write() = deduped;
    }

    /// Look up an entity by id
    pub fn get(&self, id: EntityId) -> Option<EventRecord> {
        self.entries.read().iter().find(|e| e.id == id).cloned()
    }

    /// Clone the current contents in order
    pub fn snapshot(&self) -> Vec<EventRecord> {
        self.entries.read().clone()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(id: EntityId, title: &str) -> EventRecord {
        EventRecord {
            id,
            title: title.to_string(),
            description: format!("{} description", title),
            image: None,
            ticket_link: "https://tickets.example".to_string(),
            created_at: Utc::now(),
        }
    }

    fn server(n: u64) -> EventRecord {
        record(EntityId::Server(n), &format!("event-{}", n))
    }

    fn ids(store: &ResourceStore) -> Vec<EntityId> {
        store.snapshot().iter().map(|e| e.id).collect()
    }

    #[test]
    fn test_insert_preserves_order() {
        let store = ResourceStore::new();
        assert!(store.insert(server(1)));
        assert!(store.insert(server(2)));
        assert!(store.insert(server(3)));
        assert_eq!(
            ids(&store),
            vec![
                EntityId::Server(1),
                EntityId::Server(2),
                EntityId::Server(3)
            ]
        );
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let store = ResourceStore::new();
        assert!(store.insert(server(1)));
        assert!(!store.insert(record(EntityId::Server(1), "shadow")));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(EntityId::Server(1)).unwrap().title, "event-1");
    }

    #[test]
    fn test_remove_reports_position() {
        let store = ResourceStore::new();
        for n in [1, 2, 5, 9] {
            store.insert(server(n));
        }
        let (index, removed) = store.remove(EntityId::Server(5)).unwrap();
        assert_eq!(index, 2);
        assert_eq!(removed.id, EntityId::Server(5));
        assert_eq!(
            ids(&store),
            vec![
                EntityId::Server(1),
                EntityId::Server(2),
                EntityId::Server(9)
            ]
        );
    }

    #[test]
    fn test_insert_at_restores_removed_entry_exactly() {
        let store = ResourceStore::new();
        for n in [1, 2, 5, 9] {
            store.insert(server(n));
        }
        let before = store.snapshot();
        let (index, removed) = store.remove(EntityId::Server(5)).unwrap();
        assert!(store.insert_at(index, removed));
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_insert_at_clamps_index() {
        let store = ResourceStore::new();
        store.insert(server(1));
        assert!(store.insert_at(99, server(2)));
        assert_eq!(ids(&store), vec![EntityId::Server(1), EntityId::Server(2)]);
    }

    #[test]
    fn test_replace_swaps_provisional_for_server_id() {
        let store = ResourceStore::new();
        store.insert(server(1));
        store.insert(record(EntityId::Provisional(77), "draft"));
        store.insert(server(2));

        assert!(store.replace(
            EntityId::Provisional(77),
            record(EntityId::Server(3), "committed")
        ));
        // Position preserved, provisional id gone, no duplicates
        assert_eq!(
            ids(&store),
            vec![
                EntityId::Server(1),
                EntityId::Server(3),
                EntityId::Server(2)
            ]
        );
        assert_eq!(store.get(EntityId::Server(3)).unwrap().title, "committed");
    }

    #[test]
    fn test_replace_missing_id_is_noop() {
        let store = ResourceStore::new();
        store.insert(server(1));
        assert!(!store.replace(EntityId::Server(9), server(9)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_replace_rejects_id_collision() {
        let store = ResourceStore::new();
        store.insert(server(1));
        store.insert(server(2));
        // Swapping entry 1's id to 2 would break uniqueness
        assert!(!store.replace(EntityId::Server(1), record(EntityId::Server(2), "clash")));
        assert_eq!(store.get(EntityId::Server(2)).unwrap().title, "event-2");
    }

    #[test]
    fn test_replace_all_swaps_contents() {
        let store = ResourceStore::new();
        store.insert(server(1));
        store.replace_all(vec![server(4), server(5)]);
        assert_eq!(ids(&store), vec![EntityId::Server(4), EntityId::Server(5)]);
    }

    #[test]
    fn test_replace_all_drops_duplicates() {
        let store = ResourceStore::new();
        store.replace_all(vec![server(1), record(EntityId::Server(1), "dup"), server(2)]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(EntityId::Server(1)).unwrap().title, "event-1");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Insert(u64),
            Remove(u64),
            Replace(u64, u64),
            ReplaceAll(Vec<u64>),
        }

        fn op_strategy() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0u64..20).prop_map(Op::Insert),
                (0u64..20).prop_map(Op::Remove),
                ((0u64..20), (0u64..20)).prop_map(|(a, b)| Op::Replace(a, b)),
                proptest::collection::vec(0u64..20, 0..10).prop_map(Op::ReplaceAll),
            ]
        }

        proptest! {
            // Uniqueness holds across arbitrary operation sequences
            #[test]
            fn id_uniqueness_invariant(ops in proptest::collection::vec(op_strategy(), 0..40)) {
                let store = ResourceStore::new();
                for op in ops {
                    match op {
                        Op::Insert(n) => {
                            store.insert(server(n));
                        }
                        Op::Remove(n) => {
                            store.remove(EntityId::Server(n));
                        }
                        Op::Replace(from, to) => {
                            store.replace(EntityId::Server(from), server(to));
                        }
                        Op::ReplaceAll(ns) => {
                            store.replace_all(ns.into_iter().map(server).collect());
                        }
                    }
                    let snapshot = store.snapshot();
                    let mut seen = std::collections::HashSet::new();
                    for entry in &snapshot {
                        prop_assert!(seen.insert(entry.id), "duplicate id {} observed", entry.id);
                    }
                }
            }
        }
    }
}
