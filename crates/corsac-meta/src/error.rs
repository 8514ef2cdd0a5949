//! Error and Result types for the meta-catalog core.

use thiserror::Error;

/// A convenience `Result` type.
pub type Result<T> = std::result::Result<T, MetaError>;

/// The error type for meta-catalog operations.
///
/// Variants map one-to-one onto the stable error codes exposed to clients;
/// [`MetaError::code`] returns the wire identifier.
#[derive(Debug, Error)]
pub enum MetaError {
    /// A request argument is malformed or out of range.
    #[error("illegal parameters: {0}")]
    IllegalParameters(String),

    /// A schema with the same name already exists.
    #[error("schema exists: {0}")]
    SchemaExists(String),

    /// The requested schema does not exist.
    #[error("schema not found: {0}")]
    SchemaNotFound(String),

    /// The schema still owns tables or indexes and cannot be dropped.
    #[error("schema not empty: {0}")]
    SchemaNotEmpty(String),

    /// A table with the same name already exists in the schema.
    #[error("table exists: {0}")]
    TableExists(String),

    /// The requested table does not exist.
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// The table definition failed validation.
    #[error("table definition illegal: {0}")]
    TableDefIllegal(String),

    /// Not every declared table range obtained a region.
    #[error("table region create failed: {0}")]
    TableRegionCreateFailed(String),

    /// Table metrics aggregation failed.
    #[error("table metrics failed: {0}")]
    TableMetricsFailed(String),

    /// An index with the same name already exists in the schema.
    #[error("index exists: {0}")]
    IndexExists(String),

    /// The requested index does not exist.
    #[error("index not found: {0}")]
    IndexNotFound(String),

    /// The index definition failed validation.
    #[error("index definition illegal: {0}")]
    IndexDefIllegal(String),

    /// Not every declared index range obtained a region.
    #[error("index region create failed: {0}")]
    IndexRegionCreateFailed(String),

    /// Index metrics aggregation failed.
    #[error("index metrics failed: {0}")]
    IndexMetricsFailed(String),

    /// The auto-increment service rejected the series create.
    #[error("auto increment while creating table: {0}")]
    AutoIncrementWhileCreatingTable(String),

    /// An unexpected internal failure; operators must reconcile.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MetaError {
    /// Map the error to its stable wire code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::IllegalParameters(_) => "EIllegalParameters",
            Self::SchemaExists(_) => "EschemaExists",
            Self::SchemaNotFound(_) => "EschemaNotFound",
            Self::SchemaNotEmpty(_) => "EschemaNotEmpty",
            Self::TableExists(_) => "EtableExists",
            Self::TableNotFound(_) => "EtableNotFound",
            Self::TableDefIllegal(_) => "EtableDefIllegal",
            Self::TableRegionCreateFailed(_) => "EtableRegionCreateFailed",
            Self::TableMetricsFailed(_) => "EtableMetricsFailed",
            Self::IndexExists(_) => "EindexExists",
            Self::IndexNotFound(_) => "EindexNotFound",
            Self::IndexDefIllegal(_) => "EindexDefIllegal",
            Self::IndexRegionCreateFailed(_) => "EindexRegionCreateFailed",
            Self::IndexMetricsFailed(_) => "EindexMetricsFailed",
            Self::AutoIncrementWhileCreatingTable(_) => "EautoIncrementWhileCreatingTable",
            Self::Internal(_) => "EInternal",
        }
    }
}
