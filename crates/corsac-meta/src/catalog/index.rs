//! Index operations, isomorphic to the table operations: index regions
//! instead of store regions, the index epoch, and auto-increment gated on
//! the definition flag. Indexes draw ids from the table id counter, sharing
//! one numeric space with tables.

use tracing::{error, info, warn};

use crate::catalog::{IndexView, MetaCatalog, RangeDistribution};
use crate::definition::IndexDefinition;
use crate::error::{MetaError, Result};
use crate::id_epoch::IdEpochKind;
use crate::increment::{Change, MetaIncrement};
use crate::service::CreateRegionRequest;
use crate::types::{reserved, Index, Partition, RegionType};
use crate::validator;

impl MetaCatalog {
    /// Pre-allocate an index id for a two-phase create.
    pub fn create_index_id(&self, schema_id: u64, increment: &mut MetaIncrement) -> Result<u64> {
        self.ensure_schema_exists(schema_id)?;
        let new_index_id = self.ids().next(IdEpochKind::IdNextTable, increment);
        info!(schema_id, new_index_id, "index id allocated");
        Ok(new_index_id)
    }

    /// Build the increment that creates an index: validate the definition
    /// (including the vector parameter matrix), allocate the id, create the
    /// auto-increment series when the definition asks for one, materialize
    /// one index region per declared range, and append the index record.
    pub fn create_index(
        &self,
        schema_id: u64,
        definition: &IndexDefinition,
        new_index_id: Option<u64>,
        increment: &mut MetaIncrement,
    ) -> Result<u64> {
        if schema_id == reserved::ROOT_SCHEMA {
            return Err(MetaError::IllegalParameters(
                "cannot create an index under the root schema".into(),
            ));
        }
        self.ensure_schema_exists(schema_id)?;

        validator::validate_index_definition(definition)?;
        let ranges = validator::index_ranges(definition)?;

        if self.names().get_index(schema_id, &definition.name).is_some() {
            return Err(MetaError::IndexExists(definition.name.clone()));
        }

        let index_id = match new_index_id {
            Some(id) => {
                if reserved::is_reserved(id) || self.store().indexes().exists(&id) {
                    return Err(MetaError::IllegalParameters(format!(
                        "supplied index_id [{id}] is reserved or already in use"
                    )));
                }
                id
            }
            None => self.ids().next(IdEpochKind::IdNextTable, increment),
        };

        let reservation = self
            .names()
            .reserve_index(schema_id, &definition.name, index_id)
            .ok_or_else(|| MetaError::IndexExists(definition.name.clone()))?;

        if definition.with_auto_increment {
            let start = definition.auto_increment.max(1);
            self.auto_increment().sync_create(index_id, start).map_err(|err| {
                warn!(index_id, %err, "auto increment create failed, aborting index create");
                MetaError::AutoIncrementWhileCreatingTable(err.to_string())
            })?;
        }

        let region_ids =
            self.materialize_index_regions(schema_id, index_id, definition, ranges, increment)?;

        self.ids().next(IdEpochKind::EpochRegion, increment);
        self.ids().next(IdEpochKind::EpochIndex, increment);

        let index = Index {
            id: index_id,
            schema_id,
            definition: definition.clone(),
            partitions: region_ids
                .iter()
                .map(|region_id| Partition { region_id: *region_id })
                .collect(),
        };
        increment
            .indexes
            .push(Change::create(index_id, Some(schema_id), index));

        reservation.commit();
        info!(
            schema_id,
            index_id,
            index_name = %definition.name,
            partitions = region_ids.len(),
            "index create built"
        );
        Ok(index_id)
    }

    /// Build the increment that drops an index.
    pub fn drop_index(
        &self,
        schema_id: u64,
        index_id: u64,
        increment: &mut MetaIncrement,
    ) -> Result<()> {
        self.ensure_schema_exists(schema_id)?;
        let index = self
            .store()
            .indexes()
            .get(&index_id)
            .ok_or_else(|| MetaError::IndexNotFound(format!("index_id={index_id}")))?;

        for partition in &index.partitions {
            if let Err(err) = self.region_service().drop_region(partition.region_id, increment) {
                error!(
                    index_id,
                    region_id = partition.region_id,
                    %err,
                    "drop region failed during index drop, continuing"
                );
            }
        }

        self.ids().next(IdEpochKind::EpochRegion, increment);
        self.ids().next(IdEpochKind::EpochIndex, increment);

        let index_name = index.definition.name.clone();
        let had_auto_increment = index.definition.with_auto_increment;
        increment
            .indexes
            .push(Change::delete(index_id, Some(schema_id), index));
        self.names().erase_index(schema_id, &index_name);

        if had_auto_increment {
            self.auto_increment().async_delete(index_id);
        }

        info!(schema_id, index_id, index_name, "index drop built");
        Ok(())
    }

    /// Definition-with-id views of every index in a schema. Children missing
    /// from the index store are skipped.
    pub fn get_indexes(&self, schema_id: u64) -> Result<Vec<IndexView>> {
        let schema = self
            .store()
            .schemas()
            .get(&schema_id)
            .ok_or_else(|| MetaError::SchemaNotFound(format!("schema_id={schema_id}")))?;

        let mut views = Vec::with_capacity(schema.index_ids.len());
        for index_id in &schema.index_ids {
            match self.store().indexes().get(index_id) {
                Some(index) => views.push(IndexView {
                    id: index.id,
                    schema_id: index.schema_id,
                    definition: index.definition,
                }),
                None => {
                    error!(schema_id, index_id, "index id in schema but not in index store");
                }
            }
        }
        Ok(views)
    }

    /// Number of indexes in a schema.
    pub fn get_indexes_count(&self, schema_id: u64) -> Result<u64> {
        let schema = self
            .store()
            .schemas()
            .get(&schema_id)
            .ok_or_else(|| MetaError::SchemaNotFound(format!("schema_id={schema_id}")))?;
        Ok(schema.index_ids.len() as u64)
    }

    /// Definition-with-id view of one index.
    pub fn get_index(&self, schema_id: u64, index_id: u64) -> Result<IndexView> {
        if index_id == 0 {
            return Err(MetaError::IllegalParameters("index_id is 0".into()));
        }
        if !self.store().schemas().exists(&schema_id) {
            return Err(MetaError::SchemaNotFound(format!("schema_id={schema_id}")));
        }
        let index = self
            .store()
            .indexes()
            .get(&index_id)
            .ok_or_else(|| MetaError::IndexNotFound(format!("index_id={index_id}")))?;
        Ok(IndexView {
            id: index.id,
            schema_id: index.schema_id,
            definition: index.definition,
        })
    }

    /// Resolve an index by name through the name index, then read it.
    pub fn get_index_by_name(&self, schema_id: u64, index_name: &str) -> Result<IndexView> {
        if index_name.is_empty() {
            return Err(MetaError::IllegalParameters("index_name is empty".into()));
        }
        if !self.store().schemas().exists(&schema_id) {
            return Err(MetaError::SchemaNotFound(format!("schema_id={schema_id}")));
        }
        let index_id = self.names().get_index(schema_id, index_name).ok_or_else(|| {
            warn!(schema_id, index_name, "index name not found");
            MetaError::IndexNotFound(index_name.to_string())
        })?;
        self.get_index(schema_id, index_id)
    }

    /// One range distribution per partition of an index. Partitions whose
    /// region is missing from the region store are skipped.
    pub fn get_index_range(&self, schema_id: u64, index_id: u64) -> Result<Vec<RangeDistribution>> {
        if !self.store().schemas().exists(&schema_id) {
            return Err(MetaError::SchemaNotFound(format!("schema_id={schema_id}")));
        }
        let index = self
            .store()
            .indexes()
            .get(&index_id)
            .ok_or_else(|| MetaError::IndexNotFound(format!("index_id={index_id}")))?;
        Ok(self.assemble_range_distribution(&index.partitions, index_id))
    }

    /// Create one index region per declared range, dropping every created
    /// region again if any allocation fails.
    fn materialize_index_regions(
        &self,
        schema_id: u64,
        index_id: u64,
        definition: &IndexDefinition,
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
                name: format!("I_{}_{}_part_{}", schema_id, definition.name, part),
                region_type: RegionType::Index,
                resource_tag: String::new(),
                replica,
                range: range.clone(),
                schema_id,
                table_id: 0,
                index_id,
                index_parameter: Some(definition.index_parameter.clone()),
            };
            match self.region_service().create_region(request, increment) {
                Ok(region_id) => region_ids.push(region_id),
                Err(err) => {
                    warn!(
                        schema_id,
                        index_id,
                        part,
                        %err,
                        "create region failed, aborting index create"
                    );
                    break;
                }
            }
        }

        if region_ids.len() < ranges.len() {
            self.compensate_regions(&region_ids, increment)?;
            return Err(MetaError::IndexRegionCreateFailed(format!(
                "created {} of {} regions for index [{}]",
                region_ids.len(),
                ranges.len(),
                definition.name
            )));
        }
        Ok(region_ids)
    }
}
