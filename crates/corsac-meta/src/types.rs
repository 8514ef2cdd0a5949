//! Catalog entity records and the region-side value types the core reads.
//!
//! Everything here is a plain cloneable value: the catalog store hands out
//! copies, never references into shared state.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::definition::{IndexDefinition, TableDefinition};

/// Reserved schema ids and the allocatable id floor. These five schemas exist
/// from bootstrap, are indestructible, and their ids are part of the
/// compatibility contract.
pub mod reserved {
    /// The root schema; the only schema that may parent user schemas.
    pub const ROOT_SCHEMA: u64 = 0;
    /// Coordinator-internal metadata schema.
    pub const META_SCHEMA: u64 = 1;
    /// Default user-facing schema.
    pub const DINGO_SCHEMA: u64 = 2;
    /// MySQL-compatibility schema.
    pub const MYSQL_SCHEMA: u64 = 3;
    /// `information_schema` compatibility schema.
    pub const INFORMATION_SCHEMA: u64 = 4;

    /// First id the allocator may hand out. Everything below is reserved.
    pub const ID_FLOOR: u64 = 1000;

    /// Whether `id` falls in the reserved band.
    pub fn is_reserved(id: u64) -> bool {
        id < ID_FLOOR
    }

    /// Bootstrap name of a reserved schema, if `id` is one.
    pub fn name_of(id: u64) -> Option<&'static str> {
        match id {
            ROOT_SCHEMA => Some("root"),
            META_SCHEMA => Some("meta"),
            DINGO_SCHEMA => Some("dingo"),
            MYSQL_SCHEMA => Some("mysql"),
            INFORMATION_SCHEMA => Some("information_schema"),
            _ => None,
        }
    }
}

/// A half-open key range `[start_key, end_key)`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    /// Inclusive start key.
    pub start_key: Vec<u8>,
    /// Exclusive end key.
    pub end_key: Vec<u8>,
}

impl Range {
    /// Build a range from raw key bounds.
    pub fn new(start_key: impl Into<Vec<u8>>, end_key: impl Into<Vec<u8>>) -> Self {
        Self {
            start_key: start_key.into(),
            end_key: end_key.into(),
        }
    }
}

/// Network location of a store serving a region replica.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Reachable host name or address.
    pub host: String,
    /// Service port.
    pub port: u32,
}

/// Replication role of a region peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerRole {
    /// Full voting member of the replication group.
    Voter,
    /// Non-voting catch-up replica.
    Learner,
}

/// One replica of a region.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    /// Store hosting the replica.
    pub store_id: u64,
    /// Replication role.
    pub role: PeerRole,
    /// Location clients use to reach the store.
    pub server_location: Location,
}

/// What a region stores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionType {
    /// Table data region.
    Store,
    /// Index data region.
    Index,
}

/// The placement-engine-owned definition of a region. The core only reads
/// `range` and `peers`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionDefinition {
    /// Region name, `T_<sid>_<table>_part_<i>` or `I_<sid>_<index>_part_<i>`.
    pub name: String,
    /// Region payload kind.
    pub region_type: RegionType,
    /// Key range currently served. May differ from the creation range after
    /// splits.
    pub range: Range,
    /// Replicas of the region.
    pub peers: Vec<Peer>,
    /// Owning schema.
    pub schema_id: u64,
    /// Owning table, 0 for index regions.
    pub table_id: u64,
    /// Owning index, 0 for table regions.
    pub index_id: u64,
}

/// Telemetry reported by the region's leader store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionMetrics {
    /// Rows currently held.
    pub row_count: u64,
    /// Smallest key present.
    pub min_key: Vec<u8>,
    /// Largest key present.
    pub max_key: Vec<u8>,
}

/// A replicated range of the key-space, owned by the region subsystem and
/// referenced by the catalog by id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// Region id, allocated by the region subsystem.
    pub id: u64,
    /// Placement definition.
    pub definition: RegionDefinition,
    /// Store currently leading the replication group.
    pub leader_store_id: u64,
    /// Last reported telemetry, absent until the first store heartbeat.
    pub metrics: Option<RegionMetrics>,
}

/// A namespace holding tables and indexes. Children are stored as id sets;
/// the entity stores are the single source of truth for the records.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Schema id.
    pub id: u64,
    /// Globally unique schema name.
    pub name: String,
    /// Ids of child tables, in id order.
    pub table_ids: BTreeSet<u64>,
    /// Ids of child indexes, in id order.
    pub index_ids: BTreeSet<u64>,
}

impl Schema {
    /// Build an empty schema record.
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            table_ids: BTreeSet::new(),
            index_ids: BTreeSet::new(),
        }
    }

    /// Whether the schema owns no tables and no indexes.
    pub fn is_empty(&self) -> bool {
        self.table_ids.is_empty() && self.index_ids.is_empty()
    }
}

/// The binding of one declared range to one region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    /// Region serving the partition.
    pub region_id: u64,
}

/// A horizontally partitioned table record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Table id.
    pub id: u64,
    /// Owning schema.
    pub schema_id: u64,
    /// Definition as validated at creation.
    pub definition: TableDefinition,
    /// Partitions in declared range order.
    pub partitions: Vec<Partition>,
}

/// A secondary (scalar or vector) index record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Index {
    /// Index id; tables and indexes share one id space.
    pub id: u64,
    /// Owning schema.
    pub schema_id: u64,
    /// Definition as validated at creation.
    pub definition: IndexDefinition,
    /// Partitions in declared range order.
    pub partitions: Vec<Partition>,
}

/// Aggregated metrics derived from per-region telemetry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMetrics {
    /// Sum of region row counts.
    pub rows_count: u64,
    /// Byte-lexicographically smallest reported min key.
    pub min_key: Vec<u8>,
    /// Byte-lexicographically largest reported max key.
    pub max_key: Vec<u8>,
    /// Number of partitions.
    pub part_count: u64,
}
