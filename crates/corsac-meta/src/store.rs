//! The catalog store: concurrency-safe entity maps and the apply rule.
//!
//! Every replica owns one [`CatalogStore`]. Mutations arrive only through
//! [`CatalogStore::apply`], driven sequentially by the replicated log;
//! readers take point-in-time copies and never observe a partially applied
//! increment per entity kind.

use std::collections::BTreeMap;
use std::sync::RwLock;

use tracing::{debug, warn};

use crate::id_epoch::IdEpochKind;
use crate::increment::{Change, ChangeOp, MetaIncrement};
use crate::types::{reserved, EntityMetrics, Index, Region, Schema, Table};

/// A concurrency-safe map of cloneable values.
///
/// Lock poisoning is treated as fatal, as in the storage primitives this map
/// is modelled on.
#[derive(Debug)]
pub struct SafeMap<K, V> {
    inner: RwLock<BTreeMap<K, V>>,
}

impl<K: Ord + Clone, V: Clone> SafeMap<K, V> {
    /// Create an empty map.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
        }
    }

    /// Copy out the value under `key`.
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.read().unwrap().get(key).cloned()
    }

    /// Whether `key` is present.
    pub fn exists(&self, key: &K) -> bool {
        self.inner.read().unwrap().contains_key(key)
    }

    /// Insert or replace the value under `key`.
    pub fn put(&self, key: K, value: V) {
        self.inner.write().unwrap().insert(key, value);
    }

    /// Replace the value under `key` only if present. Returns whether a
    /// replacement happened.
    pub fn put_if_exists(&self, key: &K, value: V) -> bool {
        let mut map = self.inner.write().unwrap();
        match map.get_mut(key) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Remove the value under `key`. Returns whether it was present.
    pub fn erase(&self, key: &K) -> bool {
        self.inner.write().unwrap().remove(key).is_some()
    }

    /// Mutate the value under `key` in place. Returns whether it was present.
    pub fn modify(&self, key: &K, f: impl FnOnce(&mut V)) -> bool {
        let mut map = self.inner.write().unwrap();
        match map.get_mut(key) {
            Some(slot) => {
                f(slot);
                true
            }
            None => false,
        }
    }

    /// Mutate the value under `key`, inserting `default` first when absent.
    /// Returns a copy of the value after the mutation.
    pub fn modify_or_insert(&self, key: K, default: V, f: impl FnOnce(&mut V)) -> V {
        let mut map = self.inner.write().unwrap();
        let slot = map.entry(key).or_insert(default);
        f(slot);
        slot.clone()
    }

    /// Point-in-time copy of the whole map, in key order.
    pub fn snapshot(&self) -> BTreeMap<K, V> {
        self.inner.read().unwrap().clone()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    /// Whether the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.read().unwrap().is_empty()
    }
}

impl<K: Ord + Clone, V: Clone> Default for SafeMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// The replicated catalog state of one replica, plus the derived metrics
/// caches.
#[derive(Debug, Default)]
pub struct CatalogStore {
    schemas: SafeMap<u64, Schema>,
    tables: SafeMap<u64, Table>,
    indexes: SafeMap<u64, Index>,
    regions: SafeMap<u64, Region>,
    table_metrics: SafeMap<u64, EntityMetrics>,
    index_metrics: SafeMap<u64, EntityMetrics>,
    id_epochs: SafeMap<IdEpochKind, u64>,
}

impl CatalogStore {
    /// Create a store holding the five reserved schemas and the seeded
    /// counters.
    pub fn bootstrapped() -> Self {
        let store = Self::default();
        for id in [
            reserved::ROOT_SCHEMA,
            reserved::META_SCHEMA,
            reserved::DINGO_SCHEMA,
            reserved::MYSQL_SCHEMA,
            reserved::INFORMATION_SCHEMA,
        ] {
            let name = reserved::name_of(id).unwrap_or_default();
            store.schemas.put(id, Schema::new(id, name));
        }
        for kind in IdEpochKind::ALL {
            store.id_epochs.put(kind, kind.seed());
        }
        store
    }

    /// Schema records.
    pub fn schemas(&self) -> &SafeMap<u64, Schema> {
        &self.schemas
    }

    /// Table records.
    pub fn tables(&self) -> &SafeMap<u64, Table> {
        &self.tables
    }

    /// Index records.
    pub fn indexes(&self) -> &SafeMap<u64, Index> {
        &self.indexes
    }

    /// Region records.
    pub fn regions(&self) -> &SafeMap<u64, Region> {
        &self.regions
    }

    /// Cached per-table metrics.
    pub fn table_metrics(&self) -> &SafeMap<u64, EntityMetrics> {
        &self.table_metrics
    }

    /// Cached per-index metrics.
    pub fn index_metrics(&self) -> &SafeMap<u64, EntityMetrics> {
        &self.index_metrics
    }

    /// Applied counter value of `kind`. Non-authoritative between applies.
    pub fn present_id(&self, kind: IdEpochKind) -> u64 {
        self.id_epochs.get(&kind).unwrap_or_else(|| kind.seed())
    }

    /// Apply one meta-increment.
    ///
    /// Sub-lists apply in the order `id_epochs, regions, schemas, tables,
    /// indexes`; entries within a list apply in insertion order. The caller
    /// (the replicated log) must serialize invocations.
    pub fn apply(&self, increment: &MetaIncrement) {
        for change in &increment.id_epochs {
            let kind = change.payload.kind;
            let previewed = change.payload.value;
            let applied = self.id_epochs.modify_or_insert(kind, kind.seed(), |value| {
                *value += 1;
                // A discarded increment advances the leader preview without
                // an apply; reconcile upwards so re-election cannot re-issue.
                if previewed > *value {
                    *value = previewed;
                }
            });
            if applied != previewed {
                warn!(
                    ?kind,
                    applied,
                    previewed,
                    "applied counter disagrees with previewed value"
                );
            }
        }

        for change in &increment.regions {
            match change.op {
                ChangeOp::Create | ChangeOp::Update => {
                    self.regions.put(change.id, change.payload.clone());
                }
                ChangeOp::Delete => {
                    self.regions.erase(&change.id);
                }
            }
        }

        for change in &increment.schemas {
            match change.op {
                ChangeOp::Create => self.schemas.put(change.id, change.payload.clone()),
                ChangeOp::Update => {
                    self.schemas.put_if_exists(&change.id, change.payload.clone());
                }
                ChangeOp::Delete => {
                    self.schemas.erase(&change.id);
                }
            }
        }

        for change in &increment.tables {
            self.apply_table(change);
        }

        for change in &increment.indexes {
            self.apply_index(change);
        }

        debug!(changes = increment.len(), "meta increment applied");
    }

    fn apply_table(&self, change: &Change<Table>) {
        let schema_id = change.payload.schema_id;
        match change.op {
            ChangeOp::Create => {
                self.tables.put(change.id, change.payload.clone());
                let linked = self.schemas.modify(&schema_id, |schema| {
                    schema.table_ids.insert(change.id);
                });
                if !linked {
                    warn!(schema_id, table_id = change.id, "table created under missing schema");
                }
            }
            ChangeOp::Update => {
                self.tables.put_if_exists(&change.id, change.payload.clone());
            }
            ChangeOp::Delete => {
                self.tables.erase(&change.id);
                self.schemas.modify(&schema_id, |schema| {
                    schema.table_ids.remove(&change.id);
                });
            }
        }
    }

    fn apply_index(&self, change: &Change<Index>) {
        let schema_id = change.payload.schema_id;
        match change.op {
            ChangeOp::Create => {
                self.indexes.put(change.id, change.payload.clone());
                let linked = self.schemas.modify(&schema_id, |schema| {
                    schema.index_ids.insert(change.id);
                });
                if !linked {
                    warn!(schema_id, index_id = change.id, "index created under missing schema");
                }
            }
            ChangeOp::Update => {
                self.indexes.put_if_exists(&change.id, change.payload.clone());
            }
            ChangeOp::Delete => {
                self.indexes.erase(&change.id);
                self.schemas.modify(&schema_id, |schema| {
                    schema.index_ids.remove(&change.id);
                });
            }
        }
    }
}
