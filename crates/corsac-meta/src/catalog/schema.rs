//! Schema operations: create, drop, and the schema read path.

use tracing::{info, warn};

use crate::catalog::{MetaCatalog, SchemaView};
use crate::error::{MetaError, Result};
use crate::id_epoch::IdEpochKind;
use crate::increment::{Change, MetaIncrement};
use crate::types::{reserved, Schema};

impl MetaCatalog {
    /// Build the increment that creates a schema under the root schema.
    ///
    /// Returns the allocated schema id. Schema names are globally unique.
    pub fn create_schema(
        &self,
        parent_schema_id: u64,
        schema_name: &str,
        increment: &mut MetaIncrement,
    ) -> Result<u64> {
        if parent_schema_id != reserved::ROOT_SCHEMA {
            return Err(MetaError::IllegalParameters(format!(
                "parent_schema_id [{parent_schema_id}] is not the root schema"
            )));
        }
        if schema_name.is_empty() {
            return Err(MetaError::IllegalParameters("schema_name is empty".into()));
        }
        if self.names().get_schema(schema_name).is_some() {
            return Err(MetaError::SchemaExists(schema_name.to_string()));
        }

        let new_schema_id = self.ids().next(IdEpochKind::IdNextSchema, increment);
        let reservation = self
            .names()
            .reserve_schema(schema_name, new_schema_id)
            .ok_or_else(|| MetaError::SchemaExists(schema_name.to_string()))?;

        increment.schemas.push(Change::create(
            new_schema_id,
            Some(parent_schema_id),
            Schema::new(new_schema_id, schema_name),
        ));
        self.ids().next(IdEpochKind::EpochSchema, increment);

        reservation.commit();
        info!(schema_id = new_schema_id, schema_name, "schema create built");
        Ok(new_schema_id)
    }

    /// Build the increment that drops an empty user schema.
    ///
    /// Reserved schemas are indestructible; a schema that still owns tables
    /// or indexes is rejected.
    pub fn drop_schema(
        &self,
        parent_schema_id: u64,
        schema_id: u64,
        increment: &mut MetaIncrement,
    ) -> Result<()> {
        if parent_schema_id != reserved::ROOT_SCHEMA {
            return Err(MetaError::IllegalParameters(format!(
                "parent_schema_id [{parent_schema_id}] is not the root schema"
            )));
        }
        if reserved::is_reserved(schema_id) {
            return Err(MetaError::IllegalParameters(format!(
                "schema_id [{schema_id}] is reserved"
            )));
        }

        let schema = self
            .store()
            .schemas()
            .get(&schema_id)
            .ok_or_else(|| MetaError::SchemaNotFound(format!("schema_id={schema_id}")))?;
        if !schema.is_empty() {
            return Err(MetaError::SchemaNotEmpty(format!(
                "schema_id={} table_count={} index_count={}",
                schema_id,
                schema.table_ids.len(),
                schema.index_ids.len()
            )));
        }

        self.ids().next(IdEpochKind::EpochSchema, increment);
        let schema_name = schema.name.clone();
        increment
            .schemas
            .push(Change::delete(schema_id, Some(parent_schema_id), schema));
        self.names().erase_schema(&schema_name);

        info!(schema_id, schema_name, "schema drop built");
        Ok(())
    }

    /// Snapshot of every schema with its child ids. Only the root schema may
    /// be listed.
    pub fn get_schemas(&self, schema_id: u64) -> Result<Vec<SchemaView>> {
        if schema_id != reserved::ROOT_SCHEMA {
            return Err(MetaError::IllegalParameters(format!(
                "schema_id [{schema_id}] is not the root schema"
            )));
        }
        Ok(self
            .store()
            .schemas()
            .snapshot()
            .into_values()
            .map(SchemaView::from)
            .collect())
    }

    /// Snapshot of one schema.
    pub fn get_schema(&self, schema_id: u64) -> Result<SchemaView> {
        self.store()
            .schemas()
            .get(&schema_id)
            .map(SchemaView::from)
            .ok_or_else(|| MetaError::SchemaNotFound(format!("schema_id={schema_id}")))
    }

    /// Resolve a schema by name through the name index, then read it.
    pub fn get_schema_by_name(&self, schema_name: &str) -> Result<SchemaView> {
        if schema_name.is_empty() {
            return Err(MetaError::IllegalParameters("schema_name is empty".into()));
        }
        let schema_id = self.names().get_schema(schema_name).ok_or_else(|| {
            warn!(schema_name, "schema name not found");
            MetaError::SchemaNotFound(schema_name.to_string())
        })?;
        self.get_schema(schema_id)
    }

    pub(crate) fn ensure_schema_exists(&self, schema_id: u64) -> Result<()> {
        if !self.store().schemas().exists(&schema_id) {
            return Err(MetaError::IllegalParameters(format!(
                "schema_id [{schema_id}] does not exist"
            )));
        }
        Ok(())
    }
}
