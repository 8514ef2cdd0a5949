//! Per-entity observability gauges.
//!
//! The periodic metrics sweep publishes each cached table/index aggregate as
//! prometheus gauges labelled by entity id, and retires the label set when
//! the entity is dropped.

use prometheus::{Encoder, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::error::{MetaError, Result};

/// Prometheus registry for catalog aggregates.
#[derive(Clone)]
pub struct CatalogExporter {
    registry: Registry,
    table_rows: IntGaugeVec,
    table_parts: IntGaugeVec,
    index_rows: IntGaugeVec,
    index_parts: IntGaugeVec,
}

impl CatalogExporter {
    /// Create a registry with the per-table and per-index gauge families.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let table_rows = IntGaugeVec::new(
            Opts::new("meta_table_rows_count", "Aggregated row count per table"),
            &["table_id"],
        )
        .map_err(|err| MetaError::Internal(err.to_string()))?;
        let table_parts = IntGaugeVec::new(
            Opts::new("meta_table_part_count", "Partition count per table"),
            &["table_id"],
        )
        .map_err(|err| MetaError::Internal(err.to_string()))?;
        let index_rows = IntGaugeVec::new(
            Opts::new("meta_index_rows_count", "Aggregated row count per index"),
            &["index_id"],
        )
        .map_err(|err| MetaError::Internal(err.to_string()))?;
        let index_parts = IntGaugeVec::new(
            Opts::new("meta_index_part_count", "Partition count per index"),
            &["index_id"],
        )
        .map_err(|err| MetaError::Internal(err.to_string()))?;

        for gauge in [&table_rows, &table_parts, &index_rows, &index_parts] {
            registry
                .register(Box::new(gauge.clone()))
                .map_err(|err| MetaError::Internal(err.to_string()))?;
        }

        Ok(Self {
            registry,
            table_rows,
            table_parts,
            index_rows,
            index_parts,
        })
    }

    /// Publish the latest aggregate for a table.
    pub fn update_table(&self, table_id: u64, rows_count: u64, part_count: u64) {
        let id = table_id.to_string();
        self.table_rows
            .with_label_values(&[&id])
            .set(rows_count as i64);
        self.table_parts
            .with_label_values(&[&id])
            .set(part_count as i64);
    }

    /// Drop the gauges of a removed table.
    pub fn retire_table(&self, table_id: u64) {
        let id = table_id.to_string();
        let _ = self.table_rows.remove_label_values(&[&id]);
        let _ = self.table_parts.remove_label_values(&[&id]);
    }

    /// Publish the latest aggregate for an index.
    pub fn update_index(&self, index_id: u64, rows_count: u64, part_count: u64) {
        let id = index_id.to_string();
        self.index_rows
            .with_label_values(&[&id])
            .set(rows_count as i64);
        self.index_parts
            .with_label_values(&[&id])
            .set(part_count as i64);
    }

    /// Drop the gauges of a removed index.
    pub fn retire_index(&self, index_id: u64) {
        let id = index_id.to_string();
        let _ = self.index_rows.remove_label_values(&[&id]);
        let _ = self.index_parts.remove_label_values(&[&id]);
    }

    /// Render the registry in prometheus text format.
    pub fn expose_prometheus(&self) -> Result<String> {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|err| MetaError::Internal(err.to_string()))?;
        String::from_utf8(buffer)
            .map_err(|err| MetaError::Internal(format!("invalid metrics utf8: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_and_retire_round_trip() {
        let exporter = CatalogExporter::new().unwrap();
        exporter.update_table(1001, 60, 3);
        let rendered = exporter.expose_prometheus().unwrap();
        assert!(rendered.contains("meta_table_rows_count{table_id=\"1001\"} 60"));
        assert!(rendered.contains("meta_table_part_count{table_id=\"1001\"} 3"));

        exporter.retire_table(1001);
        let rendered = exporter.expose_prometheus().unwrap();
        assert!(!rendered.contains("table_id=\"1001\""));
    }
}
