//! Table operations: id allocation, create with region materialization,
//! drop with cleanup, and the table read path.

use tracing::{error, info, warn};

use crate::catalog::{MetaCatalog, RangeDistribution, TableView};
use crate::definition::TableDefinition;
use crate::error::{MetaError, Result};
use crate::id_epoch::IdEpochKind;
use crate::increment::{Change, MetaIncrement};
use crate::service::CreateRegionRequest;
use crate::types::{reserved, Partition, Region, RegionType, Table};
use crate::validator;

impl MetaCatalog {
    /// Pre-allocate a table id for a two-phase create.
    ///
    /// Tables and indexes share one id space, so the id is also valid for a
    /// later `create_index`.
    pub fn create_table_id(&self, schema_id: u64, increment: &mut MetaIncrement) -> Result<u64> {
        self.ensure_schema_exists(schema_id)?;
        let new_table_id = self.ids().next(IdEpochKind::IdNextTable, increment);
        info!(schema_id, new_table_id, "table id allocated");
        Ok(new_table_id)
    }

    /// Build the increment that creates a table: allocate the id, create the
    /// auto-increment series when declared, materialize one region per
    /// declared range, and append the table record.
    ///
    /// `new_table_id` replays a previously allocated id for idempotent
    /// retries; pass `None` to allocate. On partial region failure every
    /// created region is dropped again and the name reservation is released
    /// before the error returns.
    pub fn create_table(
        &self,
        schema_id: u64,
        definition: &TableDefinition,
        new_table_id: Option<u64>,
        increment: &mut MetaIncrement,
    ) -> Result<u64> {
        if schema_id == reserved::ROOT_SCHEMA {
            return Err(MetaError::IllegalParameters(
                "cannot create a table under the root schema".into(),
            ));
        }
        self.ensure_schema_exists(schema_id)?;

        let auto_increment_start = validator::auto_increment_start(definition)?;
        let ranges = validator::table_ranges(definition)?;

        if self.names().get_table(schema_id, &definition.name).is_some() {
            return Err(MetaError::TableExists(definition.name.clone()));
        }

        let table_id = match new_table_id {
            Some(id) => {
                if reserved::is_reserved(id) || self.store().tables().exists(&id) {
                    return Err(MetaError::IllegalParameters(format!(
                        "supplied table_id [{id}] is reserved or already in use"
                    )));
                }
                id
            }
            None => self.ids().next(IdEpochKind::IdNextTable, increment),
        };

        let reservation = self
            .names()
            .reserve_table(schema_id, &definition.name, table_id)
            .ok_or_else(|| MetaError::TableExists(definition.name.clone()))?;

        if let Some(start) = auto_increment_start {
            self.auto_increment().sync_create(table_id, start).map_err(|err| {
                warn!(table_id, %err, "auto increment create failed, aborting table create");
                MetaError::AutoIncrementWhileCreatingTable(err.to_string())
            })?;
        }

        let region_ids = self.materialize_table_regions(schema_id, table_id, definition, ranges, increment)?;

        self.ids().next(IdEpochKind::EpochRegion, increment);
        self.ids().next(IdEpochKind::EpochTable, increment);

        let table = Table {
            id: table_id,
            schema_id,
            definition: definition.clone(),
            partitions: region_ids
                .iter()
                .map(|region_id| Partition { region_id: *region_id })
                .collect(),
        };
        increment
            .tables
            .push(Change::create(table_id, Some(schema_id), table));

        reservation.commit();
        info!(
            schema_id,
            table_id,
            table_name = %definition.name,
            partitions = region_ids.len(),
            "table create built"
        );
        Ok(table_id)
    }

    /// Build the increment that drops a table: schedule every partition
    /// region for drop, append the delete entry, and release the name.
    ///
    /// Region drops that fail are logged and skipped; cleanup of stragglers
    /// is eventually consistent.
    pub fn drop_table(
        &self,
        schema_id: u64,
        table_id: u64,
        increment: &mut MetaIncrement,
    ) -> Result<()> {
        self.ensure_schema_exists(schema_id)?;
        let table = self
            .store()
            .tables()
            .get(&table_id)
            .ok_or_else(|| MetaError::TableNotFound(format!("table_id={table_id}")))?;

        for partition in &table.partitions {
            if let Err(err) = self.region_service().drop_region(partition.region_id, increment) {
                error!(
                    table_id,
                    region_id = partition.region_id,
                    %err,
                    "drop region failed during table drop, continuing"
                );
            }
        }

        self.ids().next(IdEpochKind::EpochRegion, increment);
        self.ids().next(IdEpochKind::EpochTable, increment);

        let table_name = table.definition.name.clone();
        let had_auto_increment =
            validator::auto_increment_start(&table.definition).ok().flatten().is_some();
        increment
            .tables
            .push(Change::delete(table_id, Some(schema_id), table));
        self.names().erase_table(schema_id, &table_name);

        if had_auto_increment {
            self.auto_increment().async_delete(table_id);
        }

        info!(schema_id, table_id, table_name, "table drop built");
        Ok(())
    }

    /// Definition-with-id views of every table in a schema. Children missing
    /// from the table store are skipped.
    pub fn get_tables(&self, schema_id: u64) -> Result<Vec<TableView>> {
        let schema = self
            .store()
            .schemas()
            .get(&schema_id)
            .ok_or_else(|| MetaError::SchemaNotFound(format!("schema_id={schema_id}")))?;

        let mut views = Vec::with_capacity(schema.table_ids.len());
        for table_id in &schema.table_ids {
            match self.store().tables().get(table_id) {
                Some(table) => views.push(TableView {
                    id: table.id,
                    schema_id: table.schema_id,
                    definition: table.definition,
                }),
                None => {
                    error!(schema_id, table_id, "table id in schema but not in table store");
                }
            }
        }
        Ok(views)
    }

    /// Number of tables in a schema.
    pub fn get_tables_count(&self, schema_id: u64) -> Result<u64> {
        let schema = self
            .store()
            .schemas()
            .get(&schema_id)
            .ok_or_else(|| MetaError::SchemaNotFound(format!("schema_id={schema_id}")))?;
        Ok(schema.table_ids.len() as u64)
    }

    /// Definition-with-id view of one table.
    pub fn get_table(&self, schema_id: u64, table_id: u64) -> Result<TableView> {
        if table_id == 0 {
            return Err(MetaError::IllegalParameters("table_id is 0".into()));
        }
        if !self.store().schemas().exists(&schema_id) {
            return Err(MetaError::SchemaNotFound(format!("schema_id={schema_id}")));
        }
        let table = self
            .store()
            .tables()
            .get(&table_id)
            .ok_or_else(|| MetaError::TableNotFound(format!("table_id={table_id}")))?;
        Ok(TableView {
            id: table.id,
            schema_id: table.schema_id,
            definition: table.definition,
        })
    }

    /// Resolve a table by name through the name index, then read it.
    pub fn get_table_by_name(&self, schema_id: u64, table_name: &str) -> Result<TableView> {
        if table_name.is_empty() {
            return Err(MetaError::IllegalParameters("table_name is empty".into()));
        }
        if !self.store().schemas().exists(&schema_id) {
            return Err(MetaError::SchemaNotFound(format!("schema_id={schema_id}")));
        }
        let table_id = self.names().get_table(schema_id, table_name).ok_or_else(|| {
            warn!(schema_id, table_name, "table name not found");
            MetaError::TableNotFound(table_name.to_string())
        })?;
        self.get_table(schema_id, table_id)
    }

    /// One range distribution per partition of a table. Partitions whose
    /// region is missing from the region store are skipped.
    pub fn get_table_range(&self, schema_id: u64, table_id: u64) -> Result<Vec<RangeDistribution>> {
        if !self.store().schemas().exists(&schema_id) {
            return Err(MetaError::SchemaNotFound(format!("schema_id={schema_id}")));
        }
        let table = self
            .store()
            .tables()
            .get(&table_id)
            .ok_or_else(|| MetaError::TableNotFound(format!("table_id={table_id}")))?;
        Ok(self.assemble_range_distribution(&table.partitions, table_id))
    }

    pub(crate) fn assemble_range_distribution(
        &self,
        partitions: &[Partition],
        parent_id: u64,
    ) -> Vec<RangeDistribution> {
        let mut distributions = Vec::with_capacity(partitions.len());
        for partition in partitions {
            let region = match self.store().regions().get(&partition.region_id) {
                Some(region) => region,
                None => {
                    error!(
                        parent_id,
                        region_id = partition.region_id,
                        "region missing from region store, skipping partition"
                    );
                    continue;
                }
            };
            distributions.push(self.distribution_of(&region));
        }
        distributions
    }

    fn distribution_of(&self, region: &Region) -> RangeDistribution {
        let mut leader = None;
        let mut voters = Vec::new();
        let mut learners = Vec::new();
        for peer in &region.definition.peers {
            if peer.store_id == region.leader_store_id {
                leader = Some(peer.server_location.clone());
            }
            match peer.role {
                crate::types::PeerRole::Voter => voters.push(peer.server_location.clone()),
                crate::types::PeerRole::Learner => learners.push(peer.server_location.clone()),
            }
        }
        RangeDistribution {
            region_id: region.id,
            range: region.definition.range.clone(),
            leader,
            voters,
            learners,
            region_epoch: self.store().present_id(IdEpochKind::EpochRegion),
            store_epoch: self.store().present_id(IdEpochKind::EpochStore),
        }
    }

    /// Create one store region per declared range, dropping every created
    /// region again if any allocation fails.
    fn materialize_table_regions(
        &self,
        schema_id: u64,
        table_id: u64,
        definition: &TableDefinition,
        ranges: &[crate::types::Range],
        increment: &mut MetaIncrement,
    ) -> Result<Vec<u64>> {
        let replica = if definition.replica == 0 {
            self.config().default_replica
        } else {
            definition.replica
        };

        let mut region_ids = Vec::with_capacity(ranges.len());
        for (part, range) in ranges.iter().enumerate() {
            let request = CreateRegionRequest {
                name: format!("T_{}_{}_part_{}", schema_id, definition.name, part),
                region_type: RegionType::Store,
                resource_tag: String::new(),
                replica,
                range: range.clone(),
                schema_id,
                table_id,
                index_id: 0,
                index_parameter: None,
            };
            match self.region_service().create_region(request, increment) {
                Ok(region_id) => region_ids.push(region_id),
                Err(err) => {
                    warn!(
                        schema_id,
                        table_id,
                        part,
                        %err,
                        "create region failed, aborting table create"
                    );
                    break;
                }
            }
        }

        if region_ids.len() < ranges.len() {
            self.compensate_regions(&region_ids, increment)?;
            return Err(MetaError::TableRegionCreateFailed(format!(
                "created {} of {} regions for table [{}]",
                region_ids.len(),
                ranges.len(),
                definition.name
            )));
        }
        Ok(region_ids)
    }

    /// Drop the regions created by a failed materialization. A failed drop
    /// escalates to `Internal`: the region leaked and operators must
    /// reconcile.
    pub(crate) fn compensate_regions(
        &self,
        region_ids: &[u64],
        increment: &mut MetaIncrement,
    ) -> Result<()> {
        let mut leaked = Vec::new();
        for region_id in region_ids {
            if let Err(err) = self.region_service().drop_region(*region_id, increment) {
                error!(region_id, %err, "drop region failed during create compensation");
                leaked.push(*region_id);
            }
        }
        if !leaked.is_empty() {
            return Err(MetaError::Internal(format!(
                "compensation left {} region(s) behind: {:?}",
                leaked.len(),
                leaked
            )));
        }
        Ok(())
    }
}
