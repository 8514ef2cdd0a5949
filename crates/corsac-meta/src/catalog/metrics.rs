//! Metrics aggregation: lazy compute-and-cache on the read path, periodic
//! recompute of cached entries by the sweep.
//!
//! Aggregation folds the telemetry of every partition region. Regions
//! missing from the store or without telemetry yet are skipped; the min/max
//! seeds are only returned when no region contributed a key.

use tracing::{debug, info, warn};

use crate::catalog::{MetaCatalog, MetricsWithId};
use crate::error::{MetaError, Result};
use crate::types::{EntityMetrics, Partition};

/// Min-key seed returned when no region reports telemetry.
const MIN_KEY_SEED: [u8; 10] = [0x00; 10];
/// Max-key seed returned when no region reports telemetry.
const MAX_KEY_SEED: [u8; 10] = [0xFF; 10];

impl MetaCatalog {
    /// Aggregated metrics of a table, served from the cache when warm.
    ///
    /// A cold call computes the aggregate, admits it to the cache, and
    /// returns it. Only this admission creates cache entries; the periodic
    /// sweep recomputes existing entries but never admits new ones.
    pub fn get_table_metrics(&self, schema_id: u64, table_id: u64) -> Result<MetricsWithId> {
        if !self.store().schemas().exists(&schema_id) {
            return Err(MetaError::SchemaNotFound(format!("schema_id={schema_id}")));
        }
        if !self.store().tables().exists(&table_id) {
            return Err(MetaError::TableNotFound(format!("table_id={table_id}")));
        }

        let metrics = match self.store().table_metrics().get(&table_id) {
            Some(metrics) => {
                debug!(table_id, "table metrics served from cache");
                metrics
            }
            None => {
                let metrics = self.compute_table_metrics(table_id)?;
                self.store().table_metrics().put(table_id, metrics.clone());
                info!(
                    table_id,
                    rows_count = metrics.rows_count,
                    part_count = metrics.part_count,
                    "table metrics first calculated"
                );
                metrics
            }
        };

        Ok(MetricsWithId {
            id: table_id,
            schema_id,
            metrics,
        })
    }

    /// Aggregated metrics of an index, served from the cache when warm.
    pub fn get_index_metrics(&self, schema_id: u64, index_id: u64) -> Result<MetricsWithId> {
        if !self.store().schemas().exists(&schema_id) {
            return Err(MetaError::SchemaNotFound(format!("schema_id={schema_id}")));
        }
        if !self.store().indexes().exists(&index_id) {
            return Err(MetaError::IndexNotFound(format!("index_id={index_id}")));
        }

        let metrics = match self.store().index_metrics().get(&index_id) {
            Some(metrics) => {
                debug!(index_id, "index metrics served from cache");
                metrics
            }
            None => {
                let metrics = self.compute_index_metrics(index_id)?;
                self.store().index_metrics().put(index_id, metrics.clone());
                info!(
                    index_id,
                    rows_count = metrics.rows_count,
                    part_count = metrics.part_count,
                    "index metrics first calculated"
                );
                metrics
            }
        };

        Ok(MetricsWithId {
            id: index_id,
            schema_id,
            metrics,
        })
    }

    /// Recompute every cached table aggregate. Entries whose table has been
    /// dropped are evicted and their gauges retired.
    pub fn sweep_table_metrics(&self) {
        for (table_id, _) in self.store().table_metrics().snapshot() {
            match self.compute_table_metrics(table_id) {
                Ok(metrics) => {
                    self.store().table_metrics().put_if_exists(&table_id, metrics.clone());
                    self.exporter()
                        .update_table(table_id, metrics.rows_count, metrics.part_count);
                }
                Err(err) => {
                    warn!(table_id, %err, "table metrics recompute failed, evicting cache entry");
                    self.store().table_metrics().erase(&table_id);
                    self.exporter().retire_table(table_id);
                }
            }
        }
    }

    /// Recompute every cached index aggregate. Entries whose index has been
    /// dropped are evicted and their gauges retired.
    pub fn sweep_index_metrics(&self) {
        for (index_id, _) in self.store().index_metrics().snapshot() {
            match self.compute_index_metrics(index_id) {
                Ok(metrics) => {
                    self.store().index_metrics().put_if_exists(&index_id, metrics.clone());
                    self.exporter()
                        .update_index(index_id, metrics.rows_count, metrics.part_count);
                }
                Err(err) => {
                    warn!(index_id, %err, "index metrics recompute failed, evicting cache entry");
                    self.store().index_metrics().erase(&index_id);
                    self.exporter().retire_index(index_id);
                }
            }
        }
    }

    fn compute_table_metrics(&self, table_id: u64) -> Result<EntityMetrics> {
        let table = self
            .store()
            .tables()
            .get(&table_id)
            .ok_or_else(|| MetaError::TableMetricsFailed(format!("table_id={table_id}")))?;
        Ok(self.aggregate_partitions(&table.partitions, table_id))
    }

    fn compute_index_metrics(&self, index_id: u64) -> Result<EntityMetrics> {
        let index = self
            .store()
            .indexes()
            .get(&index_id)
            .ok_or_else(|| MetaError::IndexMetricsFailed(format!("index_id={index_id}")))?;
        Ok(self.aggregate_partitions(&index.partitions, index_id))
    }

    fn aggregate_partitions(&self, partitions: &[Partition], parent_id: u64) -> EntityMetrics {
        let mut rows_count = 0;
        let mut min_key: Option<Vec<u8>> = None;
        let mut max_key: Option<Vec<u8>> = None;

        for partition in partitions {
            let region = match self.store().regions().get(&partition.region_id) {
                Some(region) => region,
                None => {
                    warn!(
                        parent_id,
                        region_id = partition.region_id,
                        "region missing from region store, skipping in aggregation"
                    );
                    continue;
                }
            };
            let telemetry = match region.metrics {
                Some(telemetry) => telemetry,
                None => {
                    warn!(
                        parent_id,
                        region_id = partition.region_id,
                        "region has no telemetry yet, skipping in aggregation"
                    );
                    continue;
                }
            };

            rows_count += telemetry.row_count;
            min_key = Some(match min_key {
                Some(current) => current.min(telemetry.min_key),
                None => telemetry.min_key,
            });
            max_key = Some(match max_key {
                Some(current) => current.max(telemetry.max_key),
                None => telemetry.max_key,
            });
        }

        EntityMetrics {
            rows_count,
            min_key: min_key.unwrap_or_else(|| MIN_KEY_SEED.to_vec()),
            max_key: max_key.unwrap_or_else(|| MAX_KEY_SEED.to_vec()),
            part_count: partitions.len() as u64,
        }
    }
}
