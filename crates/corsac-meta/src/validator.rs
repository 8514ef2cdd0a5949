//! Pure validation of table and index definitions.
//!
//! Every function here is deterministic over its input and touches no state,
//! so the same checks can run on followers. Parameter problems map to
//! `IllegalParameters`, partition-shape problems to the definition-illegal
//! errors of the owning entity kind.

use crate::definition::{
    ColumnType, DiskAnnParameter, FlatParameter, HnswParameter, IndexDefinition, IndexParameter,
    IvfFlatParameter, IvfPqParameter, MetricType, RangePartition, ScalarIndexType,
    TableDefinition, TablePartition, VectorIndexParameter,
};
use crate::error::{MetaError, Result};
use crate::types::Range;

/// Extract the declared ranges of a table definition.
///
/// Rejects a missing partition declaration, hash partitioning, and an empty
/// range list.
pub fn table_ranges(definition: &TableDefinition) -> Result<&[Range]> {
    partition_ranges(definition.table_partition.as_ref())
        .map(|partition| partition.ranges.as_slice())
        .map_err(MetaError::TableDefIllegal)
}

/// Extract the declared ranges of an index definition, with the same rules
/// as [`table_ranges`].
pub fn index_ranges(definition: &IndexDefinition) -> Result<&[Range]> {
    partition_ranges(definition.index_partition.as_ref())
        .map(|partition| partition.ranges.as_slice())
        .map_err(MetaError::IndexDefIllegal)
}

fn partition_ranges(
    partition: Option<&TablePartition>,
) -> std::result::Result<&RangePartition, String> {
    match partition {
        None => Err("no partition provided".to_string()),
        Some(TablePartition::Hash) => Err("hash partition is not supported".to_string()),
        Some(TablePartition::Range(range_partition)) => {
            if range_partition.ranges.is_empty() {
                Err("no range provided".to_string())
            } else {
                Ok(range_partition)
            }
        }
    }
}

/// Check the auto-increment declaration of a table definition.
///
/// At most one column may be auto-increment and it must be an integer
/// column. Returns the series start value when a column is present; a start
/// of 0 defaults to 1.
pub fn auto_increment_start(definition: &TableDefinition) -> Result<Option<u64>> {
    let mut auto_columns = definition.columns.iter().filter(|c| c.auto_increment);
    let column = match auto_columns.next() {
        Some(column) => column,
        None => return Ok(None),
    };
    if auto_columns.next().is_some() {
        return Err(MetaError::IllegalParameters(format!(
            "table [{}] declares more than one auto increment column",
            definition.name
        )));
    }
    if column.column_type != ColumnType::Integer {
        return Err(MetaError::IllegalParameters(format!(
            "auto increment column [{}] is not an integer column",
            column.name
        )));
    }
    Ok(Some(definition.auto_increment.max(1)))
}

/// Validate an index definition: name, index kind, and the parameter block
/// matching that kind.
pub fn validate_index_definition(definition: &IndexDefinition) -> Result<()> {
    if definition.name.is_empty() {
        return Err(MetaError::IllegalParameters("index name is empty".to_string()));
    }

    match &definition.index_parameter {
        IndexParameter::None => Err(MetaError::IllegalParameters(
            "index_type is NONE".to_string(),
        )),
        IndexParameter::Vector(vector) => validate_vector_parameter(vector),
        IndexParameter::Scalar(scalar) => {
            if scalar.scalar_index_type == ScalarIndexType::None {
                return Err(MetaError::IllegalParameters(
                    "scalar_index_type is NONE".to_string(),
                ));
            }
            Ok(())
        }
    }
}

fn validate_vector_parameter(parameter: &VectorIndexParameter) -> Result<()> {
    match parameter {
        VectorIndexParameter::Hnsw(p) => validate_hnsw(p),
        VectorIndexParameter::Flat(p) => validate_flat(p),
        VectorIndexParameter::IvfFlat(p) => validate_ivf_flat(p),
        VectorIndexParameter::IvfPq(p) => validate_ivf_pq(p),
        VectorIndexParameter::DiskAnn(p) => validate_diskann(p),
    }
}

fn check_positive(kind: &str, field: &str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(MetaError::IllegalParameters(format!(
            "{kind} parameter {field} must be greater than 0"
        )));
    }
    Ok(())
}

fn check_metric(kind: &str, metric_type: MetricType) -> Result<()> {
    if metric_type == MetricType::None {
        return Err(MetaError::IllegalParameters(format!(
            "{kind} parameter metric_type is NONE"
        )));
    }
    Ok(())
}

fn validate_hnsw(p: &HnswParameter) -> Result<()> {
    check_positive("HNSW", "dimension", p.dimension.into())?;
    check_metric("HNSW", p.metric_type)?;
    check_positive("HNSW", "ef_construction", p.ef_construction.into())?;
    check_positive("HNSW", "max_elements", p.max_elements)?;
    check_positive("HNSW", "nlinks", p.nlinks.into())?;
    Ok(())
}

fn validate_flat(p: &FlatParameter) -> Result<()> {
    check_positive("FLAT", "dimension", p.dimension.into())?;
    check_metric("FLAT", p.metric_type)?;
    Ok(())
}

fn validate_ivf_flat(p: &IvfFlatParameter) -> Result<()> {
    check_positive("IVF_FLAT", "dimension", p.dimension.into())?;
    check_metric("IVF_FLAT", p.metric_type)?;
    check_positive("IVF_FLAT", "ncentroids", p.ncentroids.into())?;
    Ok(())
}

fn validate_ivf_pq(p: &IvfPqParameter) -> Result<()> {
    check_positive("IVF_PQ", "dimension", p.dimension.into())?;
    check_metric("IVF_PQ", p.metric_type)?;
    check_positive("IVF_PQ", "ncentroids", p.ncentroids.into())?;
    check_positive("IVF_PQ", "nsubvector", p.nsubvector.into())?;
    check_positive("IVF_PQ", "bucket_init_size", p.bucket_init_size.into())?;
    check_positive("IVF_PQ", "bucket_max_size", p.bucket_max_size.into())?;
    Ok(())
}

fn validate_diskann(p: &DiskAnnParameter) -> Result<()> {
    check_positive("DISKANN", "dimension", p.dimension.into())?;
    check_metric("DISKANN", p.metric_type)?;
    check_positive("DISKANN", "num_trees", p.num_trees.into())?;
    check_positive("DISKANN", "num_neighbors", p.num_neighbors.into())?;
    check_positive("DISKANN", "num_threads", p.num_threads.into())?;
    Ok(())
}
