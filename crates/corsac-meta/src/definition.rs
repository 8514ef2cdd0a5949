//! Table and index definitions, including the vector-index parameter
//! variants.
//!
//! Definitions arrive from clients, pass through the validator unchanged, and
//! are stored verbatim inside the catalog records. The protobuf-style one-of
//! parameter blocks are modelled as tagged enums so a parameter payload can
//! never disagree with its declared kind.

use serde::{Deserialize, Serialize};

use crate::types::Range;

/// Column value type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    /// 64-bit signed integer.
    Integer,
    /// 64-bit float.
    Float,
    /// UTF-8 text.
    Text,
    /// Raw bytes.
    Bytes,
}

/// A column of a table definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Column name.
    pub name: String,
    /// Value type.
    pub column_type: ColumnType,
    /// NOT NULL constraint.
    pub not_null: bool,
    /// Whether the column is part of the primary key.
    pub primary_key: bool,
    /// Whether values are drawn from the table's auto-increment series.
    pub auto_increment: bool,
}

impl ColumnDefinition {
    /// Create a column with all constraints off.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            not_null: false,
            primary_key: false,
            auto_increment: false,
        }
    }

    /// Set the NOT NULL constraint.
    pub fn with_not_null(mut self, not_null: bool) -> Self {
        self.not_null = not_null;
        self
    }

    /// Mark the column as part of the primary key.
    pub fn with_primary_key(mut self, primary_key: bool) -> Self {
        self.primary_key = primary_key;
        self
    }

    /// Mark the column as auto-increment.
    pub fn with_auto_increment(mut self, auto_increment: bool) -> Self {
        self.auto_increment = auto_increment;
        self
    }
}

/// Partitioning declaration of a table or index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TablePartition {
    /// Explicit ordered ranges, one region per range.
    Range(RangePartition),
    /// Hash partitioning. Declared for wire compatibility, not supported.
    Hash,
}

/// The ranges of a range partition, in declared order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangePartition {
    /// One entry per partition.
    pub ranges: Vec<Range>,
}

/// A client-supplied table definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableDefinition {
    /// Table name, unique among tables of the owning schema.
    pub name: String,
    /// Columns in declaration order.
    pub columns: Vec<ColumnDefinition>,
    /// Partitioning declaration. Required.
    pub table_partition: Option<TablePartition>,
    /// Replicas per region; values below 1 fall back to the configured
    /// default.
    pub replica: u32,
    /// Start value for the auto-increment series, 0 meaning unset.
    pub auto_increment: u64,
}

impl TableDefinition {
    /// Create a definition with no partition declaration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            table_partition: None,
            replica: 0,
            auto_increment: 0,
        }
    }

    /// Set the columns.
    pub fn with_columns(mut self, columns: Vec<ColumnDefinition>) -> Self {
        self.columns = columns;
        self
    }

    /// Declare a range partition over `ranges`.
    pub fn with_ranges(mut self, ranges: Vec<Range>) -> Self {
        self.table_partition = Some(TablePartition::Range(RangePartition { ranges }));
        self
    }

    /// Set the replica count.
    pub fn with_replica(mut self, replica: u32) -> Self {
        self.replica = replica;
        self
    }

    /// Set the auto-increment start value.
    pub fn with_auto_increment(mut self, start: u64) -> Self {
        self.auto_increment = start;
        self
    }
}

/// Distance metric for vector indexes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricType {
    /// Unset. Rejected by validation.
    None,
    /// Euclidean distance.
    L2,
    /// Inner product.
    InnerProduct,
    /// Cosine similarity.
    Cosine,
}

/// HNSW graph parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HnswParameter {
    /// Vector dimensionality.
    pub dimension: u32,
    /// Distance metric.
    pub metric_type: MetricType,
    /// Search width during graph construction.
    pub ef_construction: u32,
    /// Maximum number of indexed elements.
    pub max_elements: u64,
    /// Links per node.
    pub nlinks: u32,
}

/// Brute-force flat index parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatParameter {
    /// Vector dimensionality.
    pub dimension: u32,
    /// Distance metric.
    pub metric_type: MetricType,
}

/// IVF-Flat inverted-list parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IvfFlatParameter {
    /// Vector dimensionality.
    pub dimension: u32,
    /// Distance metric.
    pub metric_type: MetricType,
    /// Number of centroids.
    pub ncentroids: u32,
}

/// IVF-PQ product-quantization parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IvfPqParameter {
    /// Vector dimensionality.
    pub dimension: u32,
    /// Distance metric.
    pub metric_type: MetricType,
    /// Number of centroids.
    pub ncentroids: u32,
    /// Number of subvectors.
    pub nsubvector: u32,
    /// Initial bucket capacity.
    pub bucket_init_size: u32,
    /// Maximum bucket capacity.
    pub bucket_max_size: u32,
}

/// DiskANN graph parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskAnnParameter {
    /// Vector dimensionality.
    pub dimension: u32,
    /// Distance metric.
    pub metric_type: MetricType,
    /// Trees built during indexing.
    pub num_trees: u32,
    /// Neighbors kept per node.
    pub num_neighbors: u32,
    /// Threads used for index build.
    pub num_threads: u32,
}

/// Vector index algorithm selector with its matching parameter block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VectorIndexParameter {
    /// Hierarchical navigable small-world graph.
    Hnsw(HnswParameter),
    /// Brute-force scan.
    Flat(FlatParameter),
    /// Inverted file with flat residuals.
    IvfFlat(IvfFlatParameter),
    /// Inverted file with product quantization.
    IvfPq(IvfPqParameter),
    /// Disk-resident ANN graph.
    DiskAnn(DiskAnnParameter),
}

/// Scalar index backing structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarIndexType {
    /// Unset. Rejected by validation.
    None,
    /// Log-structured merge tree.
    Lsm,
    /// B-tree.
    Btree,
}

/// Scalar index parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalarIndexParameter {
    /// Backing structure.
    pub scalar_index_type: ScalarIndexType,
}

/// Index kind selector with its matching parameter block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum IndexParameter {
    /// Unset. Rejected by validation.
    None,
    /// Vector index over embeddings.
    Vector(VectorIndexParameter),
    /// Scalar secondary index.
    Scalar(ScalarIndexParameter),
}

/// A client-supplied index definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Index name, unique among indexes of the owning schema.
    pub name: String,
    /// Partitioning declaration. Required.
    pub index_partition: Option<TablePartition>,
    /// Replicas per region; values below 1 fall back to the configured
    /// default.
    pub replica: u32,
    /// Index kind and parameters.
    pub index_parameter: IndexParameter,
    /// Whether the index maintains an auto-increment series.
    pub with_auto_increment: bool,
    /// Start value for the auto-increment series, 0 meaning unset.
    pub auto_increment: u64,
}

impl IndexDefinition {
    /// Create a definition with no partition declaration and an unset
    /// parameter block.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index_partition: None,
            replica: 0,
            index_parameter: IndexParameter::None,
            with_auto_increment: false,
            auto_increment: 0,
        }
    }

    /// Declare a range partition over `ranges`.
    pub fn with_ranges(mut self, ranges: Vec<Range>) -> Self {
        self.index_partition = Some(TablePartition::Range(RangePartition { ranges }));
        self
    }

    /// Set the replica count.
    pub fn with_replica(mut self, replica: u32) -> Self {
        self.replica = replica;
        self
    }

    /// Set the index kind and parameters.
    pub fn with_parameter(mut self, parameter: IndexParameter) -> Self {
        self.index_parameter = parameter;
        self
    }

    /// Enable the auto-increment series with the given start value.
    pub fn with_auto_increment(mut self, start: u64) -> Self {
        self.with_auto_increment = true;
        self.auto_increment = start;
        self
    }
}
