//! Leader-local name maps with put-if-absent reservation semantics.
//!
//! The name index is ephemeral: only the leader consults it, and it is
//! rebuilt from the catalog store on leadership acquisition. Table names and
//! index names live in separate namespaces within a schema; schema names are
//! global. Each map is guarded by its own lock, so a reservation is a single
//! atomic put-if-absent.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

use crate::store::CatalogStore;

/// Key of one reservation, private to the guard.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum NameKey {
    Schema(String),
    Table(u64, String),
    Index(u64, String),
}

/// Ephemeral secondary mappings from names to entity ids.
#[derive(Debug, Default)]
pub struct NameIndex {
    schema_names: Mutex<HashMap<String, u64>>,
    table_names: Mutex<HashMap<(u64, String), u64>>,
    index_names: Mutex<HashMap<(u64, String), u64>>,
}

impl NameIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a schema name.
    pub fn get_schema(&self, name: &str) -> Option<u64> {
        self.schema_names.lock().unwrap().get(name).copied()
    }

    /// Resolve a table name within a schema.
    pub fn get_table(&self, schema_id: u64, name: &str) -> Option<u64> {
        self.table_names
            .lock()
            .unwrap()
            .get(&(schema_id, name.to_string()))
            .copied()
    }

    /// Resolve an index name within a schema.
    pub fn get_index(&self, schema_id: u64, name: &str) -> Option<u64> {
        self.index_names
            .lock()
            .unwrap()
            .get(&(schema_id, name.to_string()))
            .copied()
    }

    /// Reserve a schema name for `id`. Returns `None` on conflict.
    pub fn reserve_schema(&self, name: &str, id: u64) -> Option<NameReservation<'_>> {
        let mut names = self.schema_names.lock().unwrap();
        if names.contains_key(name) {
            return None;
        }
        names.insert(name.to_string(), id);
        Some(NameReservation {
            index: self,
            key: NameKey::Schema(name.to_string()),
            armed: true,
        })
    }

    /// Reserve a table name within a schema for `id`. Returns `None` on
    /// conflict.
    pub fn reserve_table(&self, schema_id: u64, name: &str, id: u64) -> Option<NameReservation<'_>> {
        let mut names = self.table_names.lock().unwrap();
        let key = (schema_id, name.to_string());
        if names.contains_key(&key) {
            return None;
        }
        names.insert(key, id);
        Some(NameReservation {
            index: self,
            key: NameKey::Table(schema_id, name.to_string()),
            armed: true,
        })
    }

    /// Reserve an index name within a schema for `id`. Returns `None` on
    /// conflict.
    pub fn reserve_index(&self, schema_id: u64, name: &str, id: u64) -> Option<NameReservation<'_>> {
        let mut names = self.index_names.lock().unwrap();
        let key = (schema_id, name.to_string());
        if names.contains_key(&key) {
            return None;
        }
        names.insert(key, id);
        Some(NameReservation {
            index: self,
            key: NameKey::Index(schema_id, name.to_string()),
            armed: true,
        })
    }

    /// Drop a schema name mapping.
    pub fn erase_schema(&self, name: &str) {
        self.schema_names.lock().unwrap().remove(name);
    }

    /// Drop a table name mapping.
    pub fn erase_table(&self, schema_id: u64, name: &str) {
        self.table_names
            .lock()
            .unwrap()
            .remove(&(schema_id, name.to_string()));
    }

    /// Drop an index name mapping.
    pub fn erase_index(&self, schema_id: u64, name: &str) {
        self.index_names
            .lock()
            .unwrap()
            .remove(&(schema_id, name.to_string()));
    }

    /// Rebuild every map from the catalog store. Called on leadership
    /// acquisition; any previous content is discarded.
    pub fn rebuild(&self, store: &CatalogStore) {
        let mut schema_names = self.schema_names.lock().unwrap();
        schema_names.clear();
        for (id, schema) in store.schemas().snapshot() {
            schema_names.insert(schema.name.clone(), id);
        }
        drop(schema_names);

        let mut table_names = self.table_names.lock().unwrap();
        table_names.clear();
        for (id, table) in store.tables().snapshot() {
            table_names.insert((table.schema_id, table.definition.name.clone()), id);
        }
        drop(table_names);

        let mut index_names = self.index_names.lock().unwrap();
        index_names.clear();
        for (id, index) in store.indexes().snapshot() {
            index_names.insert((index.schema_id, index.definition.name.clone()), id);
        }
        debug!("name index rebuilt from catalog store");
    }

    fn erase_key(&self, key: &NameKey) {
        match key {
            NameKey::Schema(name) => self.erase_schema(name),
            NameKey::Table(schema_id, name) => self.erase_table(*schema_id, name),
            NameKey::Index(schema_id, name) => self.erase_index(*schema_id, name),
        }
    }
}

/// A scoped name reservation.
///
/// The reservation is released when the guard drops, unless
/// [`NameReservation::commit`] ran first: the build path commits after the
/// increment is fully assembled, and every early return releases the name
/// automatically.
#[derive(Debug)]
pub struct NameReservation<'a> {
    index: &'a NameIndex,
    key: NameKey,
    armed: bool,
}

impl NameReservation<'_> {
    /// Keep the mapping permanently.
    pub fn commit(mut self) {
        self.armed = false;
    }
}

impl Drop for NameReservation<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.index.erase_key(&self.key);
        }
    }
}
