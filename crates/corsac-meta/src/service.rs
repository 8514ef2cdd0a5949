//! Contracts for the external collaborators of the catalog core.
//!
//! The region placement engine, the auto-increment subsystem, and the
//! replicated log live outside this crate; the core consumes them through
//! these traits. Calls on the write path are blocking round-trips.

use crate::definition::IndexParameter;
use crate::error::Result;
use crate::increment::MetaIncrement;
use crate::types::{Range, RegionType};

/// Inputs for one region allocation.
#[derive(Clone, Debug, PartialEq)]
pub struct CreateRegionRequest {
    /// Region name, unique per partition.
    pub name: String,
    /// Region payload kind.
    pub region_type: RegionType,
    /// Placement resource tag, empty for the default pool.
    pub resource_tag: String,
    /// Replica count.
    pub replica: u32,
    /// Key range to serve.
    pub range: Range,
    /// Owning schema.
    pub schema_id: u64,
    /// Owning table, 0 for index regions.
    pub table_id: u64,
    /// Owning index, 0 for table regions.
    pub index_id: u64,
    /// Index parameters, for index regions.
    pub index_parameter: Option<IndexParameter>,
}

/// The region allocator and placement engine.
///
/// Implementations append the region sub-increments for the allocation (or
/// drop) to the caller's meta-increment so the whole mutation stays one
/// atomic change-set.
pub trait RegionService: Send + Sync {
    /// Allocate a region and append its create entry to `increment`.
    /// Returns the new region id.
    fn create_region(&self, request: CreateRegionRequest, increment: &mut MetaIncrement)
        -> Result<u64>;

    /// Schedule a region drop and append its delete entry to `increment`.
    fn drop_region(&self, region_id: u64, increment: &mut MetaIncrement) -> Result<()>;
}

/// The auto-increment series subsystem.
pub trait AutoIncrementService: Send + Sync {
    /// Create the series for an entity, synchronously. The caller aborts its
    /// mutation when this fails.
    fn sync_create(&self, entity_id: u64, start: u64) -> Result<()>;

    /// Schedule deletion of an entity's series, best effort. Failures are
    /// logged by the implementation, never surfaced.
    fn async_delete(&self, entity_id: u64);
}

/// The consensus layer that orders and replicates meta-increments.
///
/// Only the leader submits; every replica receives the committed increment
/// through its apply path.
pub trait ReplicatedLog: Send + Sync {
    /// Submit one increment for commit. Blocks until the commit outcome is
    /// known.
    fn submit(&self, increment: MetaIncrement) -> Result<()>;
}
