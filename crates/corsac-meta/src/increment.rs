//! The meta-increment: the atomic change-set submitted to the replicated log.
//!
//! A builder accumulates every side effect of one catalog mutation into a
//! single [`MetaIncrement`]; the log applies it on every replica in one shot.
//! Sub-lists apply in the order `id_epochs, regions, schemas, tables,
//! indexes`, and entries within a list apply in insertion order, so region
//! records always exist before the table or index partitions that reference
//! them.

use serde::{Deserialize, Serialize};

use crate::id_epoch::IdEpoch;
use crate::types::{Index, Region, Schema, Table};

/// Mutation kind of a single change entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeOp {
    /// Insert a new record.
    Create,
    /// Replace an existing record.
    Update,
    /// Remove a record.
    Delete,
}

/// One mutation of one record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Change<T> {
    /// Id of the mutated record.
    pub id: u64,
    /// Mutation kind.
    pub op: ChangeOp,
    /// Parent schema, where the entity kind has one.
    pub schema_id: Option<u64>,
    /// The record value. Deletes carry the record as it was, so apply can
    /// unlink children without extra lookups.
    pub payload: T,
}

impl<T> Change<T> {
    /// Build a create entry.
    pub fn create(id: u64, schema_id: Option<u64>, payload: T) -> Self {
        Self {
            id,
            op: ChangeOp::Create,
            schema_id,
            payload,
        }
    }

    /// Build an update entry.
    pub fn update(id: u64, schema_id: Option<u64>, payload: T) -> Self {
        Self {
            id,
            op: ChangeOp::Update,
            schema_id,
            payload,
        }
    }

    /// Build a delete entry carrying the current record.
    pub fn delete(id: u64, schema_id: Option<u64>, payload: T) -> Self {
        Self {
            id,
            op: ChangeOp::Delete,
            schema_id,
            payload,
        }
    }
}

/// The atomic change-set for one catalog mutation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaIncrement {
    /// Counter adds. Applied first.
    pub id_epochs: Vec<Change<IdEpoch>>,
    /// Region changes, produced by the region service. Applied before any
    /// entity that references them.
    pub regions: Vec<Change<Region>>,
    /// Schema changes.
    pub schemas: Vec<Change<Schema>>,
    /// Table changes.
    pub tables: Vec<Change<Table>>,
    /// Index changes. Applied last.
    pub indexes: Vec<Change<Index>>,
}

impl MetaIncrement {
    /// Whether the increment carries no changes at all.
    pub fn is_empty(&self) -> bool {
        self.id_epochs.is_empty()
            && self.regions.is_empty()
            && self.schemas.is_empty()
            && self.tables.is_empty()
            && self.indexes.is_empty()
    }

    /// Total number of change entries across all sub-lists.
    pub fn len(&self) -> usize {
        self.id_epochs.len()
            + self.regions.len()
            + self.schemas.len()
            + self.tables.len()
            + self.indexes.len()
    }
}
