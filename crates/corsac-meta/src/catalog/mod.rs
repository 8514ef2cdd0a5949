//! The meta-catalog control surface.
//!
//! [`MetaCatalog`] owns the replicated catalog store plus the leader-local
//! state (name index, id/epoch preview) and exposes the build and read
//! operations of the coordinator. Write operations validate the request
//! against current state and assemble one [`MetaIncrement`]; the caller
//! submits it to the replicated log and every replica feeds the committed
//! increment back through [`MetaCatalog::apply`].

mod index;
mod metrics;
mod schema;
mod table;

use std::sync::Arc;

use crate::config::MetaConfig;
use crate::definition::{IndexDefinition, TableDefinition};
use crate::error::Result;
use crate::export::CatalogExporter;
use crate::id_epoch::{IdEpochGenerator, IdEpochKind};
use crate::increment::MetaIncrement;
use crate::name_index::NameIndex;
use crate::service::{AutoIncrementService, RegionService};
use crate::store::CatalogStore;
use crate::types::{EntityMetrics, Location, Range, Schema};

/// Read-path copy of a schema with its child ids in id order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaView {
    /// Schema id.
    pub id: u64,
    /// Schema name.
    pub name: String,
    /// Child table ids.
    pub table_ids: Vec<u64>,
    /// Child index ids.
    pub index_ids: Vec<u64>,
}

impl From<Schema> for SchemaView {
    fn from(schema: Schema) -> Self {
        Self {
            id: schema.id,
            name: schema.name,
            table_ids: schema.table_ids.into_iter().collect(),
            index_ids: schema.index_ids.into_iter().collect(),
        }
    }
}

/// Read-path copy of a table definition with its ids.
#[derive(Clone, Debug, PartialEq)]
pub struct TableView {
    /// Table id.
    pub id: u64,
    /// Owning schema.
    pub schema_id: u64,
    /// The stored definition.
    pub definition: TableDefinition,
}

/// Read-path copy of an index definition with its ids.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexView {
    /// Index id.
    pub id: u64,
    /// Owning schema.
    pub schema_id: u64,
    /// The stored definition.
    pub definition: IndexDefinition,
}

/// One partition of a table or index as served right now.
///
/// The range comes from the region record, not from the creation-time
/// declaration: regions may have split since. The epoch snapshots are
/// optimistic-concurrency cookies for clients.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RangeDistribution {
    /// Region serving the partition.
    pub region_id: u64,
    /// Range currently served by the region.
    pub range: Range,
    /// Location of the leader replica, if the leader store is among the
    /// peers.
    pub leader: Option<Location>,
    /// Locations of voter replicas.
    pub voters: Vec<Location>,
    /// Locations of learner replicas.
    pub learners: Vec<Location>,
    /// Region-map epoch at assembly time.
    pub region_epoch: u64,
    /// Store-map epoch at assembly time.
    pub store_epoch: u64,
}

/// Aggregated metrics of a table or index, tagged with its ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetricsWithId {
    /// Entity id.
    pub id: u64,
    /// Owning schema.
    pub schema_id: u64,
    /// The aggregate.
    pub metrics: EntityMetrics,
}

/// The coordinator meta-catalog core.
pub struct MetaCatalog {
    config: MetaConfig,
    store: CatalogStore,
    names: NameIndex,
    ids: IdEpochGenerator,
    exporter: CatalogExporter,
    region_service: Arc<dyn RegionService>,
    auto_increment: Arc<dyn AutoIncrementService>,
}

impl MetaCatalog {
    /// Create a bootstrapped catalog wired to its external collaborators.
    ///
    /// The store starts with the five reserved schemas; the leader-local
    /// state is rebuilt from it as if leadership had just been acquired.
    pub fn new(
        config: MetaConfig,
        region_service: Arc<dyn RegionService>,
        auto_increment: Arc<dyn AutoIncrementService>,
    ) -> Result<Self> {
        config.validate()?;
        let catalog = Self {
            config,
            store: CatalogStore::bootstrapped(),
            names: NameIndex::new(),
            ids: IdEpochGenerator::new(),
            exporter: CatalogExporter::new()?,
            region_service,
            auto_increment,
        };
        catalog.on_leader_start();
        Ok(catalog)
    }

    /// Rebuild the leader-local state from the applied catalog store.
    ///
    /// Called when this replica acquires leadership; followers never consult
    /// the name index or the id preview.
    pub fn on_leader_start(&self) {
        self.names.rebuild(&self.store);
        for kind in IdEpochKind::ALL {
            self.ids.restore(kind, self.store.present_id(kind));
        }
    }

    /// Apply one committed meta-increment to the local replica.
    pub fn apply(&self, increment: &MetaIncrement) {
        self.store.apply(increment);
    }

    /// The replicated catalog store of this replica.
    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    /// The observability gauges fed by the periodic sweep.
    pub fn exporter(&self) -> &CatalogExporter {
        &self.exporter
    }

    pub(crate) fn config(&self) -> &MetaConfig {
        &self.config
    }

    pub(crate) fn names(&self) -> &NameIndex {
        &self.names
    }

    pub(crate) fn ids(&self) -> &IdEpochGenerator {
        &self.ids
    }

    pub(crate) fn region_service(&self) -> &dyn RegionService {
        self.region_service.as_ref()
    }

    pub(crate) fn auto_increment(&self) -> &dyn AutoIncrementService {
        self.auto_increment.as_ref()
    }
}
